//! [`Command`] for adding a new [`Book`] to the catalog.

use common::operations::Insert;
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, Book},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for adding a new [`Book`] to the catalog.
#[derive(Clone, Debug)]
pub struct CreateBook {
    /// [`book::Title`] of the new [`Book`].
    pub title: book::Title,

    /// [`book::Amount`] of copies of the new [`Book`] in stock.
    pub amount: book::Amount,
}

impl<Db> Command<CreateBook> for Service<Db>
where
    Db: Database<Insert<Book>, Err = Traced<database::Error>>,
{
    type Ok = Book;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateBook) -> Result<Self::Ok, Self::Err> {
        let CreateBook { title, amount } = cmd;

        let book = Book {
            id: book::Id::new(),
            title,
            amount,
            is_retired: false,
        };

        self.database()
            .execute(Insert(book.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))
            .map(drop)?;

        tracing::info!(
            book.id = %book.id,
            book.amount = %book.amount,
            "book added: {}",
            book.title,
        );

        Ok(book)
    }
}

/// Error of [`CreateBook`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
