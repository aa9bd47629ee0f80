//! [`Query`] collection related to a single [`Order`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{order, Order},
    infra::{database, Database},
    Service,
};

use super::Query;

/// Queries an existing [`Order`] by its [`order::Id`].
#[derive(Clone, Copy, Debug, From)]
pub struct ById(pub order::Id);

impl<Db> Query<ById> for Service<Db>
where
    Db: Database<
        Select<By<Option<Order>, order::Id>>,
        Ok = Option<Order>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, ById(id): ById) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?
            .ok_or(ExecutionError::OrderNotExists(id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`ById`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    OrderNotExists(#[error(not(source))] order::Id),
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
    use common::Days;

    use crate::{
        command::CreateOrder,
        domain::{order, user},
        query::orders,
        test_support::{book, service},
        Command as _, Query as _,
    };

    use super::ById;

    #[tokio::test]
    async fn finds_orders() {
        let svc = service();
        let b = book(&svc, 3).await;
        let (reader, other) = (user::Id::new(), user::Id::new());
        let term =
            order::Term::new(order::RentalKind::OutOfLibrary, Days::new(7))
                .unwrap();

        let mut placed = vec![];
        for user_id in [reader, other, reader] {
            placed.push(
                svc.execute(CreateOrder {
                    book_id: b.id,
                    user_id,
                    term,
                })
                .await
                .unwrap(),
            );
        }

        let found = svc.execute(ById(placed[1].id)).await.unwrap();
        assert_eq!(found, placed[1]);

        let all = svc.execute(orders::All::by(())).await.unwrap();
        assert_eq!(all.len(), 3);

        let own = svc
            .execute(orders::OfUser::by(reader))
            .await
            .unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|o| o.user_id == reader));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let svc = service();

        let e = svc.execute(ById(order::Id::new())).await.unwrap_err();
        assert!(e.as_ref().is_not_found());
    }
}
