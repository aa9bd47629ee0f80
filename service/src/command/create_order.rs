//! [`Command`] for placing a new [`Order`].

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, order, user, Book, Order},
    infra::{database, Database},
    Service,
};

use super::{lock_error, Command};

/// [`Command`] for placing a new [`Order`] of a [`Book`].
///
/// Stock of the [`Book`] is left untouched until the [`Order`] is approved.
#[derive(Clone, Copy, Debug)]
pub struct CreateOrder {
    /// ID of the [`Book`] to be ordered.
    pub book_id: book::Id,

    /// ID of the user placing the [`Order`].
    pub user_id: user::Id,

    /// [`order::Term`] of the [`Order`].
    pub term: order::Term,
}

impl<Db> Command<CreateOrder> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Book, book::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Book>, book::Id>>,
            Ok = Option<Book>,
            Err = Traced<database::Error>,
        > + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateOrder) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateOrder {
            book_id,
            user_id,
            term,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid racing with the `Book` being retired.
        tx.execute(Lock(By::new(book_id)))
            .await
            .map_err(lock_error(E::BookBusy(book_id)))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let book = tx
            .execute(Select(By::<Option<Book>, _>::new(book_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookNotExists(book_id))
            .map_err(tracerr::wrap!())?;
        if book.is_retired {
            return Err(tracerr::new!(E::BookRetired(book_id)));
        }
        if !book.amount.in_stock() {
            return Err(tracerr::new!(E::BookNotInStock(book_id)));
        }

        let order = Order::place(book_id, user_id, term);

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(
            order.id = %order.id,
            book.id = %book_id,
            user.id = %user_id,
            order.rental_kind = %order.rental_kind,
            order.due_date = %order.due_date,
            "order placed",
        );

        Ok(order)
    }
}

/// Error of [`CreateOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] is being changed concurrently for too long.
    #[display("`Book(id: {_0})` is busy, try again later")]
    BookBusy(#[error(not(source))] book::Id),

    /// [`Book`] has no copies in stock.
    #[display("`Book(id: {_0})` is not in stock")]
    BookNotInStock(#[error(not(source))] book::Id),

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
}

impl ExecutionError {
    /// Indicates whether this [`ExecutionError`] means that the requested
    /// entity doesn't exist.
    ///
    /// Always `false`, as a missing [`Book`] is a violation of ordering
    /// rules here rather than a lookup failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use common::{
        operations::{By, Select, Update},
        Days,
    };

    use crate::{
        domain::{
            book,
            order::{self, RentalKind},
            user, Order,
        },
        infra::Database as _,
        test_support::{book, service},
        Command as _,
    };

    use super::{CreateOrder, ExecutionError};

    fn term(kind: RentalKind, days: u16) -> order::Term {
        order::Term::new(kind, Days::new(days)).unwrap()
    }

    #[tokio::test]
    async fn places_order_without_touching_stock() {
        let svc = service();
        let b = book(&svc, 1).await;
        let user_id = user::Id::new();

        let order = svc
            .execute(CreateOrder {
                book_id: b.id,
                user_id,
                term: term(RentalKind::OutOfLibrary, 21),
            })
            .await
            .unwrap();

        assert_eq!(order.state, order::State::Placed);
        assert_eq!(order.book_id, b.id);
        assert_eq!(order.user_id, user_id);
        assert_eq!(order.start_date, order::StartDate::today());
        assert_eq!(order.due_date.days_since(&order.start_date), 21);
        assert_eq!(order.return_date, None);

        let stored = svc
            .database()
            .execute(Select(By::<Option<Order>, _>::new(order.id)))
            .await
            .unwrap();
        assert_eq!(stored, Some(order));

        let b = svc
            .database()
            .execute(Select(By::<Option<book::Book>, _>::new(b.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b.amount, book::Amount::from(1));
    }

    #[tokio::test]
    async fn reading_hall_order_is_due_today() {
        let svc = service();
        let b = book(&svc, 2).await;

        let order = svc
            .execute(CreateOrder {
                book_id: b.id,
                user_id: user::Id::new(),
                term: term(RentalKind::ToReadingHall, 0),
            })
            .await
            .unwrap();

        assert_eq!(order.rental_kind, RentalKind::ToReadingHall);
        assert_eq!(order.due_date.days_since(&order.start_date), 0);
    }

    #[tokio::test]
    async fn rejects_unavailable_books() {
        let svc = service();
        let user_id = user::Id::new();
        let term = term(RentalKind::OutOfLibrary, 7);

        let missing = book::Id::new();
        let e = svc
            .execute(CreateOrder {
                book_id: missing,
                user_id,
                term,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            e.as_ref(),
            ExecutionError::BookNotExists(id) if *id == missing,
        ));
        assert!(!e.as_ref().is_not_found());

        let empty = book(&svc, 0).await;
        let e = svc
            .execute(CreateOrder {
                book_id: empty.id,
                user_id,
                term,
            })
            .await
            .unwrap_err();
        assert!(matches!(e.as_ref(), ExecutionError::BookNotInStock(_)));

        let mut retired = book(&svc, 5).await;
        retired.is_retired = true;
        svc.database().execute(Update(retired.clone())).await.unwrap();
        let e = svc
            .execute(CreateOrder {
                book_id: retired.id,
                user_id,
                term,
            })
            .await
            .unwrap_err();
        assert!(matches!(e.as_ref(), ExecutionError::BookRetired(_)));

        let orders = svc
            .database()
            .execute(Select(By::<Vec<Order>, _>::new(user_id)))
            .await
            .unwrap();
        assert!(orders.is_empty());
    }
}
