//! [`Command`] for retiring a [`Book`] from the catalog.

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, Book},
    infra::{database, Database},
    Service,
};

use super::{lock_error, Command};

/// [`Command`] for retiring a [`Book`] from the catalog.
///
/// Retired [`Book`]s cannot be ordered anymore, while the existing orders of
/// them are left intact.
#[derive(Clone, Copy, Debug)]
pub struct RetireBook {
    /// ID of the [`Book`] to be retired.
    pub book_id: book::Id,
}

impl<Db> Command<RetireBook> for Service<Db>
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

    async fn execute(&self, cmd: RetireBook) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RetireBook { book_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

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
            return Err(tracerr::new!(E::BookAlreadyRetired(book_id)));
        }
        book.is_retired = true;

        tx.execute(Update(book.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(book.id = %book.id, "book retired");

        Ok(book)
    }
}

/// Error of [`RetireBook`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] is retired already.
    #[display("`Book(id: {_0})` is retired already")]
    BookAlreadyRetired(#[error(not(source))] book::Id),

    /// [`Book`] is being changed concurrently for too long.
    #[display("`Book(id: {_0})` is busy, try again later")]
    BookBusy(#[error(not(source))] book::Id),

    /// [`Book`] with the provided ID does not exist.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
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
    use common::Days;

    use crate::{
        command::{create_order, CreateOrder},
        domain::{order, user},
        test_support::{book, service},
        Command as _,
    };

    use super::{ExecutionError, RetireBook};

    #[tokio::test]
    async fn retired_book_cannot_be_ordered() {
        let svc = service();
        let b = book(&svc, 2).await;

        let retired = svc.execute(RetireBook { book_id: b.id }).await.unwrap();
        assert!(retired.is_retired);
        assert!(!retired.is_available());

        let e = svc.execute(RetireBook { book_id: b.id }).await.unwrap_err();
        assert!(matches!(e.as_ref(), ExecutionError::BookAlreadyRetired(_)));

        let e = svc
            .execute(CreateOrder {
                book_id: b.id,
                user_id: user::Id::new(),
                term: order::Term::new(
                    order::RentalKind::ToReadingHall,
                    Days::ZERO,
                )
                .unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            e.as_ref(),
            create_order::ExecutionError::BookRetired(_),
        ));
    }
}
