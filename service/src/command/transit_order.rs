//! [`Command`]s for moving an [`Order`] through its lifecycle.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, order, user, Book, Order},
    infra::{database, Database},
    Service,
};

use super::{lock_error, Command};

/// [`Command`] for changing the [`order::State`] of an [`Order`].
///
/// Approving an [`Order`] takes a copy of the ordered [`Book`] out of stock,
/// and returning it puts the copy back. Nothing is written unless the whole
/// transition succeeds.
#[derive(Clone, Copy, Debug)]
pub struct TransitOrder {
    /// ID of the [`Order`] to be changed.
    pub order_id: order::Id,

    /// ID of the user changing the [`Order`].
    pub initiator_id: user::Id,

    /// [`order::State`] to move the [`Order`] to.
    pub to: order::State,
}

impl<Db> Command<TransitOrder> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<Update<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Book, book::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Book>, book::Id>>,
            Ok = Option<Book>,
            Err = Traced<database::Error>,
        > + Database<Update<Book>, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: TransitOrder) -> Result<Self::Ok, Self::Err> {
        use order::State as S;
        use ExecutionError as E;

        let TransitOrder {
            order_id,
            initiator_id,
            to,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent transitions of the same `Order`.
        tx.execute(Lock(By::<Order, _>::new(order_id)))
            .await
            .map_err(lock_error(E::OrderBusy(order_id)))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let mut order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;

        order
            .state
            .transition(to)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        if matches!(to, S::Approved | S::Returned) {
            let book_id = order.book_id;

            // Avoid concurrent stock changes of the same `Book`.
            tx.execute(Lock(By::<Book, _>::new(book_id)))
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

            book.amount = if to == S::Approved {
                book.amount
                    .decremented()
                    .ok_or(E::BookNotInStock(book_id))
            } else {
                _ = order.return_date.replace(order::ReturnDate::today());
                book.amount.incremented().ok_or(E::StockOverflow(book_id))
            }
            .map_err(tracerr::wrap!())?;

            tx.execute(Update(book.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            tracing::debug!(
                book.id = %book.id,
                book.amount = %book.amount,
                "book stock changed",
            );
        }

        let from = order.state;
        order.state = to;

        tx.execute(Update(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(
            order.id = %order.id,
            order.state = %order.state,
            initiator.id = %initiator_id,
            "order state changed from {from}",
        );

        Ok(order)
    }
}

/// Defines a [`Command`] moving an [`Order`] to the specific
/// [`order::State`] via [`TransitOrder`].
macro_rules! define_transition {
    ($(#[$meta:meta])* $name:ident => $state:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug)]
        pub struct $name {
            /// ID of the [`Order`] to be changed.
            pub order_id: order::Id,

            /// ID of the user changing the [`Order`].
            pub initiator_id: user::Id,
        }

        impl<Db> Command<$name> for Service<Db>
        where
            Self: Command<
                TransitOrder,
                Ok = Order,
                Err = Traced<ExecutionError>,
            >,
        {
            type Ok = Order;
            type Err = Traced<ExecutionError>;

            async fn execute(
                &self,
                cmd: $name,
            ) -> Result<Self::Ok, Self::Err> {
                let $name {
                    order_id,
                    initiator_id,
                } = cmd;

                self.execute(TransitOrder {
                    order_id,
                    initiator_id,
                    to: order::State::$state,
                })
                .await
                .map_err(tracerr::wrap!())
            }
        }
    };
}

define_transition! {
    /// [`Command`] for approving a placed [`Order`], reserving a copy of the
    /// ordered [`Book`].
    ApproveOrder => Approved
}

define_transition! {
    /// [`Command`] for declining a placed [`Order`].
    DeclineOrder => Declined
}

define_transition! {
    /// [`Command`] for handing the [`Book`] of an approved [`Order`] over to
    /// its reader.
    CollectOrder => Taken
}

define_transition! {
    /// [`Command`] for returning the [`Book`] of a taken [`Order`] back to
    /// stock.
    ReturnOrder => Returned
}

/// Error of [`TransitOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] is being changed concurrently for too long.
    #[display("`Book(id: {_0})` is busy, try again later")]
    BookBusy(#[error(not(source))] book::Id),

    /// [`Book`] has no copies in stock to approve the [`Order`].
    #[display("`Book(id: {_0})` is not in stock")]
    BookNotInStock(#[error(not(source))] book::Id),

    /// [`Book`] of the [`Order`] does not exist.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Order`] is being changed concurrently for too long.
    #[display("`Order(id: {_0})` is busy, try again later")]
    OrderBusy(#[error(not(source))] order::Id),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`Book`] stock cannot hold any more copies.
    #[display("`Book(id: {_0})` stock overflow")]
    StockOverflow(#[error(not(source))] book::Id),

    /// [`order::State`] transition is not allowed.
    #[display("{_0}")]
    #[from]
    Transition(order::TransitionError),
}

impl ExecutionError {
    /// Indicates whether this [`ExecutionError`] means that the requested
    /// [`Order`] doesn't exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::OrderNotExists(_))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::{
        operations::{By, Lock, Select, Transact},
        Days,
    };

    use crate::{
        command::CreateOrder,
        domain::{
            book,
            order::{self, RentalKind, State, TransitionDenial},
            user, Book, Order,
        },
        infra::{Database as _, Memory},
        test_support::{book, service, service_with_lock_timeout},
        Command as _, Service,
    };

    use super::{
        ApproveOrder, CollectOrder, DeclineOrder, ExecutionError, ReturnOrder,
        TransitOrder,
    };

    async fn place(svc: &Service<Memory>, book_id: book::Id) -> Order {
        svc.execute(CreateOrder {
            book_id,
            user_id: user::Id::new(),
            term: order::Term::new(RentalKind::OutOfLibrary, Days::new(14))
                .unwrap(),
        })
        .await
        .unwrap()
    }

    async fn amount(svc: &Service<Memory>, id: book::Id) -> book::Amount {
        svc.database()
            .execute(Select(By::<Option<Book>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
            .amount
    }

    async fn stored(svc: &Service<Memory>, id: order::Id) -> Order {
        svc.database()
            .execute(Select(By::<Option<Order>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
    }

    fn denial(e: &ExecutionError) -> TransitionDenial {
        match e {
            ExecutionError::Transition(e) => e.reason,
            e => panic!("not a transition error: {e}"),
        }
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let svc = service();
        let b = book(&svc, 1).await;
        let order_id = place(&svc, b.id).await.id;
        let initiator_id = user::Id::new();

        let approved = svc
            .execute(ApproveOrder {
                order_id,
                initiator_id,
            })
            .await
            .unwrap();
        assert_eq!(approved.state, State::Approved);
        assert_eq!(amount(&svc, b.id).await, book::Amount::ZERO);

        let e = svc
            .execute(ApproveOrder {
                order_id,
                initiator_id,
            })
            .await
            .unwrap_err();
        assert_eq!(denial(e.as_ref()), TransitionDenial::Regress);
        assert_eq!(
            e.as_ref().to_string(),
            "cannot change order state from approved to approved: would \
             regress",
        );
        assert_eq!(amount(&svc, b.id).await, book::Amount::ZERO);

        let taken = svc
            .execute(CollectOrder {
                order_id,
                initiator_id,
            })
            .await
            .unwrap();
        assert_eq!(taken.state, State::Taken);
        assert_eq!(taken.return_date, None);
        assert_eq!(amount(&svc, b.id).await, book::Amount::ZERO);

        let returned = svc
            .execute(ReturnOrder {
                order_id,
                initiator_id,
            })
            .await
            .unwrap();
        assert_eq!(returned.state, State::Returned);
        assert_eq!(returned.return_date, Some(order::ReturnDate::today()));
        assert_eq!(amount(&svc, b.id).await, book::Amount::from(1));
        assert_eq!(stored(&svc, order_id).await, returned);

        let e = svc
            .execute(DeclineOrder {
                order_id,
                initiator_id,
            })
            .await
            .unwrap_err();
        assert_eq!(denial(e.as_ref()), TransitionDenial::Terminal);
        assert_eq!(stored(&svc, order_id).await, returned);
    }

    #[tokio::test]
    async fn declines_only_placed_orders() {
        let svc = service();
        let b = book(&svc, 3).await;
        let initiator_id = user::Id::new();

        let placed = place(&svc, b.id).await;
        let declined = svc
            .execute(DeclineOrder {
                order_id: placed.id,
                initiator_id,
            })
            .await
            .unwrap();
        assert_eq!(declined.state, State::Declined);
        assert_eq!(amount(&svc, b.id).await, book::Amount::from(3));

        let approved = place(&svc, b.id).await;
        _ = svc
            .execute(ApproveOrder {
                order_id: approved.id,
                initiator_id,
            })
            .await
            .unwrap();
        let e = svc
            .execute(DeclineOrder {
                order_id: approved.id,
                initiator_id,
            })
            .await
            .unwrap_err();
        assert_eq!(
            denial(e.as_ref()),
            TransitionDenial::ApprovedNotDeclinable,
        );
        assert_eq!(stored(&svc, approved.id).await.state, State::Approved);
        assert_eq!(amount(&svc, b.id).await, book::Amount::from(2));
    }

    #[tokio::test]
    async fn cannot_skip_states() {
        let svc = service();
        let b = book(&svc, 1).await;
        let order = place(&svc, b.id).await;
        let initiator_id = user::Id::new();

        let e = svc
            .execute(CollectOrder {
                order_id: order.id,
                initiator_id,
            })
            .await
            .unwrap_err();
        assert_eq!(denial(e.as_ref()), TransitionDenial::NotApproved);

        let e = svc
            .execute(ReturnOrder {
                order_id: order.id,
                initiator_id,
            })
            .await
            .unwrap_err();
        assert_eq!(denial(e.as_ref()), TransitionDenial::NotTaken);

        assert_eq!(stored(&svc, order.id).await, order);
        assert_eq!(amount(&svc, b.id).await, book::Amount::from(1));
    }

    #[tokio::test]
    async fn approval_requires_stock() {
        let svc = service();
        let b = book(&svc, 1).await;
        let initiator_id = user::Id::new();
        let first = place(&svc, b.id).await;
        let second = place(&svc, b.id).await;

        _ = svc
            .execute(ApproveOrder {
                order_id: first.id,
                initiator_id,
            })
            .await
            .unwrap();

        let e = svc
            .execute(ApproveOrder {
                order_id: second.id,
                initiator_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            e.as_ref(),
            ExecutionError::BookNotInStock(id) if *id == b.id,
        ));
        assert_eq!(stored(&svc, second.id).await.state, State::Placed);
        assert_eq!(amount(&svc, b.id).await, book::Amount::ZERO);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let svc = service();

        let e = svc
            .execute(TransitOrder {
                order_id: order::Id::new(),
                initiator_id: user::Id::new(),
                to: State::Approved,
            })
            .await
            .unwrap_err();
        assert!(matches!(e.as_ref(), ExecutionError::OrderNotExists(_)));
        assert!(e.as_ref().is_not_found());
    }

    #[tokio::test]
    async fn concurrent_approvals_take_stock_once() {
        let svc = service();
        let b = book(&svc, 5).await;
        let order = place(&svc, b.id).await;
        let approve = || {
            svc.execute(ApproveOrder {
                order_id: order.id,
                initiator_id: user::Id::new(),
            })
        };

        let (first, second) = tokio::join!(approve(), approve());

        assert!(first.is_ok() != second.is_ok(), "exactly one succeeds");
        let e = first.err().or(second.err()).unwrap();
        assert_eq!(denial(e.as_ref()), TransitionDenial::Regress);
        assert_eq!(amount(&svc, b.id).await, book::Amount::from(4));
    }

    #[tokio::test]
    async fn locked_order_is_busy() {
        let svc = service_with_lock_timeout(Duration::from_millis(50));
        let b = book(&svc, 1).await;
        let order = place(&svc, b.id).await;

        let tx = svc.database().execute(Transact).await.unwrap();
        tx.execute(Lock(By::<Order, _>::new(order.id))).await.unwrap();

        let e = svc
            .execute(ApproveOrder {
                order_id: order.id,
                initiator_id: user::Id::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            e.as_ref(),
            ExecutionError::OrderBusy(id) if *id == order.id,
        ));
        assert!(!e.as_ref().is_not_found());

        drop(tx);
        assert_eq!(stored(&svc, order.id).await.state, State::Placed);
        assert_eq!(amount(&svc, b.id).await, book::Amount::from(1));
    }
}
