//! [`Database`] implementations.

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use tracerr::Traced;

use crate::{
    domain::{user, Book, Order},
    infra::{database, Database},
};

use super::{Connection, Memory, NonTx, Record, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(Tx::from_non_tx(self.0.clone())))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

impl<R: Record> Database<Lock<By<R, R::Id>>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<R, R::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(R::key(by.into_inner()))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C, R> Database<Select<By<Option<R>, R::Id>>> for Memory<C>
where
    C: Connection,
    R: Record,
{
    type Ok = Option<R>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<R>, R::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.get(by.into_inner()).await.map_err(tracerr::wrap!())
    }
}

impl<C, R> Database<Insert<R>> for Memory<C>
where
    C: Connection,
    R: Record,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(record): Insert<R>,
    ) -> Result<Self::Ok, Self::Err> {
        self.put(record).await.map_err(tracerr::wrap!())
    }
}

impl<C, R> Database<Update<R>> for Memory<C>
where
    C: Connection,
    R: Record,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(record): Update<R>,
    ) -> Result<Self::Ok, Self::Err> {
        self.put(record).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Vec<Book>, ()>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Vec<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Book>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut books = self.all::<Book>().await.map_err(tracerr::wrap!())?;
        books.sort_by(|a, b| (&a.title, a.id).cmp(&(&b.title, b.id)));
        Ok(books)
    }
}

impl<C> Database<Select<By<Vec<Order>, ()>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Vec<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Order>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut orders =
            self.all::<Order>().await.map_err(tracerr::wrap!())?;
        orders.sort_by_key(|o| (o.start_date, o.id));
        Ok(orders)
    }
}

impl<C> Database<Select<By<Vec<Order>, user::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Vec<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Order>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();

        let mut orders = self
            .all::<Order>()
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .filter(|o| o.user_id == user_id)
            .collect::<Vec<_>>();
        orders.sort_by_key(|o| (o.start_date, o.id));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};

    use crate::{
        domain::{book, Book},
        infra::{database, memory, Database as _, Memory},
    };

    fn book(amount: u32) -> Book {
        Book {
            id: book::Id::new(),
            title: book::Title::new("Solaris").unwrap(),
            amount: book::Amount::from(amount),
            is_retired: false,
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let db = Memory::new(Duration::from_secs(1));
        let mut b = book(1);
        db.execute(Insert(b.clone())).await.unwrap();

        let tx = db.execute(Transact).await.unwrap();
        b.amount = book::Amount::ZERO;
        tx.execute(Update(b.clone())).await.unwrap();

        let staged = tx
            .execute(Select(By::<Option<Book>, _>::new(b.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(staged.amount, book::Amount::ZERO);
        drop(tx);

        let stored = db
            .execute(Select(By::<Option<Book>, _>::new(b.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.amount, book::Amount::from(1));
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let db = Memory::new(Duration::from_secs(1));
        let b = book(3);

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(b.clone())).await.unwrap();
        assert!(db
            .execute(Select(By::<Option<Book>, _>::new(b.id)))
            .await
            .unwrap()
            .is_none());

        tx.execute(Commit).await.unwrap();
        assert_eq!(
            db.execute(Select(By::<Option<Book>, _>::new(b.id)))
                .await
                .unwrap(),
            Some(b),
        );

        let e = tx.execute(Commit).await.unwrap_err();
        assert!(matches!(
            e.as_ref(),
            database::Error::Memory(memory::Error::TxFinished),
        ));
    }

    #[tokio::test]
    async fn lock_is_held_until_tx_ends() {
        let db = Memory::new(Duration::from_millis(50));
        let id = book::Id::new();

        let tx1 = db.execute(Transact).await.unwrap();
        tx1.execute(Lock(By::<Book, _>::new(id))).await.unwrap();
        tx1.execute(Lock(By::<Book, _>::new(id))).await.unwrap();

        let tx2 = db.execute(Transact).await.unwrap();
        let e = tx2.execute(Lock(By::<Book, _>::new(id))).await.unwrap_err();
        assert!(e.as_ref().is_lock_timeout());

        drop(tx1);
        tx2.execute(Lock(By::<Book, _>::new(id))).await.unwrap();
    }
}
