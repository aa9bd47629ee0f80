//! In-process database client definitions.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock};
use tracerr::Traced;

use crate::infra::database::{self, memory};

use super::{Key, Record, Tables};

/// Generic in-process database connection.
pub trait Connection {
    /// Returns the [`Record`] with the provided ID, if any.
    ///
    /// # Errors
    ///
    /// If the connection cannot be used anymore.
    fn get<R: Record>(
        &self,
        id: R::Id,
    ) -> impl Future<Output = Result<Option<R>, Traced<database::Error>>>;

    /// Returns all the [`Record`]s of the `R` type, in no particular order.
    ///
    /// # Errors
    ///
    /// If the connection cannot be used anymore.
    fn all<R: Record>(
        &self,
    ) -> impl Future<Output = Result<Vec<R>, Traced<database::Error>>>;

    /// Stores the provided [`Record`], overwriting the existing one.
    ///
    /// # Errors
    ///
    /// If the connection cannot be used anymore.
    fn put<R: Record>(
        &self,
        record: R,
    ) -> impl Future<Output = Result<(), Traced<database::Error>>>;
}

/// State shared by all the clients of the same store.
#[derive(Debug)]
struct Shared {
    /// Committed [`Tables`].
    tables: RwLock<Tables>,

    /// Locks of the individual [`Record`]s.
    ///
    /// Only the locks being held or waited for are kept here.
    locks: Mutex<HashMap<Key, Arc<Mutex<()>>>>,

    /// Maximum time to wait for a lock.
    lock_timeout: Duration,
}

/// Non-transactional in-process database client.
///
/// Every write is visible immediately.
#[derive(Clone, Debug)]
pub struct NonTx(Arc<Shared>);

impl NonTx {
    /// Creates a new [`NonTx`] client of an empty store.
    pub(super) fn new(lock_timeout: Duration) -> Self {
        Self(Arc::new(Shared {
            tables: RwLock::default(),
            locks: Mutex::default(),
            lock_timeout,
        }))
    }
}

/// Forgets the `locks` nobody holds or waits for.
fn forget_unused(locks: &mut HashMap<Key, Arc<Mutex<()>>>) {
    locks.retain(|_, l| Arc::strong_count(l) > 1);
}

impl Connection for NonTx {
    async fn get<R: Record>(
        &self,
        id: R::Id,
    ) -> Result<Option<R>, Traced<database::Error>> {
        Ok(R::table(&*self.0.tables.read().await).get(&id).cloned())
    }

    async fn all<R: Record>(&self) -> Result<Vec<R>, Traced<database::Error>> {
        Ok(R::table(&*self.0.tables.read().await)
            .values()
            .cloned()
            .collect())
    }

    async fn put<R: Record>(
        &self,
        record: R,
    ) -> Result<(), Traced<database::Error>> {
        _ = R::table_mut(&mut *self.0.tables.write().await)
            .insert(record.id(), record);
        Ok(())
    }
}

/// Writes and locks of a [`Tx`] not committed yet.
#[derive(Debug, Default)]
struct Staged {
    /// Written [`Record`]s.
    tables: Tables,

    /// Held locks.
    locks: HashMap<Key, OwnedMutexGuard<()>>,
}

/// Transactional in-process database client.
///
/// Writes are staged until [`Tx::commit()`] and discarded if it's never
/// called. Locks are held until the [`Tx`] is committed or dropped.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client this [`Tx`] was started from.
    non_tx: NonTx,

    /// [`Staged`] state, or [`None`] once committed.
    staged: Arc<Mutex<Option<Staged>>>,
}

impl Tx {
    /// Starts a new [`Tx`] from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(non_tx: NonTx) -> Self {
        Self {
            non_tx,
            staged: Arc::new(Mutex::new(Some(Staged::default()))),
        }
    }

    /// Returns the [`Staged`] state of this [`Tx`].
    async fn staged(
        &self,
    ) -> Result<MutexGuard<'_, Option<Staged>>, Traced<database::Error>> {
        let staged = self.staged.lock().await;
        if staged.is_none() {
            return Err(tracerr::new!(database::Error::from(
                memory::Error::TxFinished
            )));
        }
        Ok(staged)
    }

    /// Acquires the lock of the provided [`Key`] until this [`Tx`] ends.
    ///
    /// Re-locking an already held [`Key`] is a no-op.
    ///
    /// # Errors
    ///
    /// With [`memory::Error::LockTimeout`] if the lock is not acquired
    /// within the configured timeout.
    pub async fn lock(&self, key: Key) -> Result<(), Traced<database::Error>> {
        if self
            .staged()
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .is_some_and(|s| s.locks.contains_key(&key))
        {
            return Ok(());
        }

        let lock = {
            let mut locks = self.non_tx.0.locks.lock().await;
            // `Tx`s dropped without a commit leave their locks behind.
            forget_unused(&mut locks);
            Arc::clone(locks.entry(key).or_default())
        };
        let guard =
            tokio::time::timeout(self.non_tx.0.lock_timeout, lock.lock_owned())
                .await
                .map_err(|_| {
                    tracerr::new!(database::Error::from(
                        memory::Error::LockTimeout
                    ))
                })?;

        if let Some(s) =
            self.staged().await.map_err(tracerr::wrap!())?.as_mut()
        {
            _ = s.locks.insert(key, guard);
        }
        Ok(())
    }

    /// Commits this [`Tx`], making its writes visible and releasing its
    /// locks.
    ///
    /// # Errors
    ///
    /// With [`memory::Error::TxFinished`] if this [`Tx`] is committed
    /// already.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(Staged { tables, locks }) =
            self.staged().await.map_err(tracerr::wrap!())?.take()
        else {
            return Ok(());
        };

        self.non_tx.0.tables.write().await.merge(tables);
        drop(locks);
        forget_unused(&mut *self.non_tx.0.locks.lock().await);
        Ok(())
    }
}

impl Connection for Tx {
    async fn get<R: Record>(
        &self,
        id: R::Id,
    ) -> Result<Option<R>, Traced<database::Error>> {
        let staged = self.staged().await.map_err(tracerr::wrap!())?;
        if let Some(r) = staged
            .as_ref()
            .and_then(|s| R::table(&s.tables).get(&id))
        {
            return Ok(Some(r.clone()));
        }
        drop(staged);

        self.non_tx.get(id).await.map_err(tracerr::wrap!())
    }

    async fn all<R: Record>(&self) -> Result<Vec<R>, Traced<database::Error>> {
        let mut all = R::table(&*self.non_tx.0.tables.read().await).clone();
        if let Some(s) = self.staged().await.map_err(tracerr::wrap!())?.as_ref()
        {
            all.extend(
                R::table(&s.tables).iter().map(|(id, r)| (*id, r.clone())),
            );
        }
        Ok(all.into_values().collect())
    }

    async fn put<R: Record>(
        &self,
        record: R,
    ) -> Result<(), Traced<database::Error>> {
        if let Some(s) = self.staged().await.map_err(tracerr::wrap!())?.as_mut()
        {
            _ = R::table_mut(&mut s.tables).insert(record.id(), record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::domain::{book, order};

    use super::{Key, NonTx, Tx};

    async fn known_locks(non_tx: &NonTx) -> usize {
        non_tx.0.locks.lock().await.len()
    }

    #[tokio::test]
    async fn committed_locks_are_forgotten() {
        let non_tx = NonTx::new(Duration::from_secs(1));

        for _ in 0..10 {
            let tx = Tx::from_non_tx(non_tx.clone());
            tx.lock(Key::Book(book::Id::new())).await.unwrap();
            tx.lock(Key::Order(order::Id::new())).await.unwrap();
            tx.commit().await.unwrap();
        }

        assert_eq!(known_locks(&non_tx).await, 0);
    }

    #[tokio::test]
    async fn dropped_locks_are_forgotten_on_next_lock() {
        let non_tx = NonTx::new(Duration::from_secs(1));

        for _ in 0..10 {
            let tx = Tx::from_non_tx(non_tx.clone());
            tx.lock(Key::Book(book::Id::new())).await.unwrap();
        }

        let tx = Tx::from_non_tx(non_tx.clone());
        tx.lock(Key::Book(book::Id::new())).await.unwrap();
        assert_eq!(known_locks(&non_tx).await, 1);

        tx.commit().await.unwrap();
        assert_eq!(known_locks(&non_tx).await, 0);
    }

    #[tokio::test]
    async fn held_lock_is_kept() {
        let non_tx = NonTx::new(Duration::from_millis(50));
        let key = Key::Book(book::Id::new());

        let holder = Tx::from_non_tx(non_tx.clone());
        holder.lock(key).await.unwrap();

        let other = Tx::from_non_tx(non_tx.clone());
        other.lock(Key::Order(order::Id::new())).await.unwrap();
        other.commit().await.unwrap();
        assert_eq!(known_locks(&non_tx).await, 1);

        let waiter = Tx::from_non_tx(non_tx.clone());
        assert!(waiter.lock(key).await.is_err());

        holder.commit().await.unwrap();
        waiter.lock(key).await.unwrap();
    }
}
