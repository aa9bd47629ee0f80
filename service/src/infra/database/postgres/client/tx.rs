//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{connection, Connection},
};

use super::NonTx;

/// Transactional Postgres database client.
///
/// The transaction is started lazily, on the first statement, and is rolled
/// back once the last clone of the client is dropped without
/// [`Tx::commit()`].
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client to start the [`connection::Tx`] from.
    non_tx: NonTx,

    /// Lazily started [`connection::Tx`].
    tx: Arc<Mutex<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(non_tx: NonTx) -> Self {
        Self {
            non_tx,
            tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the underlying [`connection::Tx`] of this [`Tx`] client,
    /// starting it if required.
    async fn connection(
        &self,
    ) -> Result<MutexGuard<'_, Option<connection::Tx>>, Traced<database::Error>>
    {
        let mut tx = self.tx.lock().await;
        if tx.is_none() {
            let conn =
                self.non_tx.connection().await.map_err(tracerr::wrap!())?;
            *tx = Some(
                connection::Tx::begin(conn, self.non_tx.lock_timeout)
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }
        Ok(tx)
    }

    /// Commits this [`Tx`] client.
    ///
    /// # Errors
    ///
    /// If failed to commit transaction of this [`Tx`] client.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let tx = self.tx.lock().await.take();
        if let Some(tx) = tx {
            tx.commit().await.map_err(tracerr::wrap!())
        } else {
            // Nothing was executed, so nothing to commit.
            Ok(())
        }
    }
}

/// Runs the provided method of [`Connection`] on the started
/// [`connection::Tx`].
macro_rules! on_tx {
    ($this:ident.$method:ident($($arg:expr),*)) => {{
        let guard = $this.connection().await.map_err(tracerr::wrap!())?;
        let tx = guard.as_ref().expect("started in `Tx::connection()`");
        tx.$method($($arg),*).await.map_err(tracerr::wrap!())
    }};
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        on_tx!(self.query(stmt, params))
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        on_tx!(self.query_opt(stmt, params))
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        on_tx!(self.exec(stmt, params))
    }
}
