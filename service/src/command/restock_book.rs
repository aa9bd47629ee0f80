//! [`Command`] for adding copies of a [`Book`] to stock.

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, Book},
    infra::{database, Database},
    Service,
};

use super::{lock_error, Command};

/// [`Command`] for adding copies of a [`Book`] to stock.
#[derive(Clone, Copy, Debug)]
pub struct RestockBook {
    /// ID of the [`Book`] to be restocked.
    pub book_id: book::Id,

    /// [`book::Amount`] of copies to add.
    pub amount: book::Amount,
}

impl<Db> Command<RestockBook> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Book, book::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Book>, book::Id>>,
            Ok = Option<Book>,
            Err = Traced<database::Error>,
        > + Database<Update<Book>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Book;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RestockBook) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RestockBook { book_id, amount } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent stock changes of the same `Book`.
        tx.execute(Lock(By::new(book_id)))
            .await
            .map_err(lock_error(E::BookBusy(book_id)))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let mut book = tx
            .execute(Select(By::<Option<Book>, _>::new(book_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookNotExists(book_id))
            .map_err(tracerr::wrap!())?;
        if book.is_retired {
            return Err(tracerr::new!(E::BookRetired(book_id)));
        }

        book.amount = book
            .amount
            .checked_add(amount)
            .ok_or(E::StockOverflow(book_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(book.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(
            book.id = %book.id,
            book.amount = %book.amount,
            "book restocked with {amount} copies",
        );

        Ok(book)
    }
}

/// Error of [`RestockBook`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] is being changed concurrently for too long.
    #[display("`Book(id: {_0})` is busy, try again later")]
    BookBusy(#[error(not(source))] book::Id),

    /// [`Book`] with the provided ID does not exist.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Book`] is retired from the catalog.
    #[display("`Book(id: {_0})` is retired")]
    BookRetired(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Book`] stock cannot hold that many copies.
    #[display("`Book(id: {_0})` stock overflow")]
    StockOverflow(#[error(not(source))] book::Id),
}

impl ExecutionError {
    /// Indicates whether this [`ExecutionError`] means that the requested
    /// [`Book`] doesn't exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::BookNotExists(_))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::book,
        test_support::{book, service},
        Command as _,
    };

    use super::{ExecutionError, RestockBook};

    #[tokio::test]
    async fn adds_copies() {
        let svc = service();
        let b = book(&svc, 1).await;

        let restocked = svc
            .execute(RestockBook {
                book_id: b.id,
                amount: book::Amount::from(2),
            })
            .await
            .unwrap();
        assert_eq!(restocked.amount, book::Amount::from(3));

        let e = svc
            .execute(RestockBook {
                book_id: b.id,
                amount: book::Amount::from(u32::MAX),
            })
            .await
            .unwrap_err();
        assert!(matches!(e.as_ref(), ExecutionError::StockOverflow(_)));

        let e = svc
            .execute(RestockBook {
                book_id: book::Id::new(),
                amount: book::Amount::from(1),
            })
            .await
            .unwrap_err();
        assert!(e.as_ref().is_not_found());
    }

    #[tokio::test]
    async fn stock_never_exceeds_max_amount() {
        let svc = service();
        let b = book(&svc, 1).await;

        let restocked = svc
            .execute(RestockBook {
                book_id: b.id,
                amount: book::Amount::from(2_147_483_646),
            })
            .await
            .unwrap();
        assert_eq!(restocked.amount, book::Amount::MAX);

        let e = svc
            .execute(RestockBook {
                book_id: b.id,
                amount: book::Amount::from(1),
            })
            .await
            .unwrap_err();
        assert!(matches!(e.as_ref(), ExecutionError::StockOverflow(id) if *id == b.id));
    }
}
