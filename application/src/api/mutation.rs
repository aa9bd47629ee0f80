//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Places a new `Order` of the `Book` on behalf of the current user.
    ///
    /// Reading hall rentals must last `0` days, while loans out of the
    /// library must last `7`, `14` or `21` days.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `INVALID_RENTAL_TERM` - the `days` are not allowed for the
    ///                           `rentalKind`;
    /// - `BOOK_NOT_EXISTS` - the `Book` with the specified ID does not exist;
    /// - `BOOK_RETIRED` - the `Book` is retired from the catalog;
    /// - `BOOK_NOT_IN_STOCK` - the `Book` has no copies in stock;
    /// - `RESOURCE_BUSY` - the `Book` is being changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            book_id = %book_id,
            days = days,
            gql.name = "createOrder",
            otel.name = Self::SPAN_NAME,
            rental_kind = ?rental_kind,
        ),
    )]
    pub async fn create_order(
        book_id: api::book::Id,
        rental_kind: api::order::RentalKind,
        days: i32,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let session = ctx.current_session().await?;
        let term = api::order::term(rental_kind, days).map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateOrder {
                book_id: book_id.into(),
                user_id: session.user_id,
                term,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Approves the placed `Order`, taking a copy of its `Book` out of
    /// stock.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `NOT_STAFF` - the current user is not a librarian or an admin;
    /// - `ORDER_NOT_EXISTS` - the `Order` with the specified ID does not
    ///                        exist;
    /// - `INVALID_ORDER_TRANSITION` - the `Order` is not placed;
    /// - `BOOK_NOT_IN_STOCK` - the `Book` has no copies in stock;
    /// - `RESOURCE_BUSY` - the `Order` is being changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "approveOrder",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn approve_order(
        id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let session = ctx.staff_session().await?;

        ctx.service()
            .execute(command::ApproveOrder {
                order_id: id.into(),
                initiator_id: session.user_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Declines the placed `Order`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `NOT_STAFF` - the current user is not a librarian or an admin;
    /// - `ORDER_NOT_EXISTS` - the `Order` with the specified ID does not
    ///                        exist;
    /// - `INVALID_ORDER_TRANSITION` - the `Order` is not placed;
    /// - `RESOURCE_BUSY` - the `Order` is being changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "declineOrder",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn decline_order(
        id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let session = ctx.staff_session().await?;

        ctx.service()
            .execute(command::DeclineOrder {
                order_id: id.into(),
                initiator_id: session.user_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Book` of the approved `Order` as taken by its reader.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `NOT_STAFF` - the current user is not a librarian or an admin;
    /// - `ORDER_NOT_EXISTS` - the `Order` with the specified ID does not
    ///                        exist;
    /// - `INVALID_ORDER_TRANSITION` - the `Order` is not approved;
    /// - `RESOURCE_BUSY` - the `Order` is being changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "collectOrder",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn collect_order(
        id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let session = ctx.staff_session().await?;

        ctx.service()
            .execute(command::CollectOrder {
                order_id: id.into(),
                initiator_id: session.user_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Book` of the taken `Order` back to stock.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `NOT_STAFF` - the current user is not a librarian or an admin;
    /// - `ORDER_NOT_EXISTS` - the `Order` with the specified ID does not
    ///                        exist;
    /// - `INVALID_ORDER_TRANSITION` - the `Book` of the `Order` is not taken;
    /// - `RESOURCE_BUSY` - the `Order` is being changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "returnOrder",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn return_order(
        id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let session = ctx.staff_session().await?;

        ctx.service()
            .execute(command::ReturnOrder {
                order_id: id.into(),
                initiator_id: session.user_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Adds a new `Book` to the catalog.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `NOT_STAFF` - the current user is not a librarian or an admin;
    /// - `NEGATIVE_AMOUNT` - the `amount` is negative.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = amount,
            gql.name = "createBook",
            otel.name = Self::SPAN_NAME,
            title = %title,
        ),
    )]
    pub async fn create_book(
        title: api::book::Title,
        amount: i32,
        ctx: &Context,
    ) -> Result<api::Book, Error> {
        _ = ctx.staff_session().await?;
        let amount = api::book::amount(amount).map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateBook {
                title: title.into(),
                amount,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Puts the `amount` of new copies of the `Book` into stock.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `NOT_STAFF` - the current user is not a librarian or an admin;
    /// - `NEGATIVE_AMOUNT` - the `amount` is negative;
    /// - `BOOK_NOT_EXISTS` - the `Book` with the specified ID does not exist;
    /// - `BOOK_RETIRED` - the `Book` is retired from the catalog;
    /// - `STOCK_OVERFLOW` - the stock of the `Book` would overflow;
    /// - `RESOURCE_BUSY` - the `Book` is being changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = amount,
            gql.name = "restockBook",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn restock_book(
        id: api::book::Id,
        amount: i32,
        ctx: &Context,
    ) -> Result<api::Book, Error> {
        _ = ctx.staff_session().await?;
        let amount = api::book::amount(amount).map_err(ctx.error())?;

        ctx.service()
            .execute(command::RestockBook {
                book_id: id.into(),
                amount,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Retires the `Book` from the catalog, so it cannot be ordered anymore.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `NOT_STAFF` - the current user is not a librarian or an admin;
    /// - `BOOK_NOT_EXISTS` - the `Book` with the specified ID does not exist;
    /// - `BOOK_RETIRED` - the `Book` is retired already;
    /// - `RESOURCE_BUSY` - the `Book` is being changed concurrently.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "retireBook",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn retire_book(
        id: api::book::Id,
        ctx: &Context,
    ) -> Result<api::Book, Error> {
        _ = ctx.staff_session().await?;

        ctx.service()
            .execute(command::RetireBook { book_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    /// Errors of changing `Book` stock.
    enum BookError {
        NotInStock(CONFLICT, "BOOK_NOT_IN_STOCK") =>
            "`Book` with the provided ID has no copies in stock",

        Retired(CONFLICT, "BOOK_RETIRED") =>
            "`Book` with the provided ID is retired",

        StockOverflow(CONFLICT, "STOCK_OVERFLOW") =>
            "Stock of the `Book` with the provided ID would overflow",
    }
}

impl AsError for command::create_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookBusy(_) => api::ResourceError::Busy.into(),
            Self::BookNotInStock(_) => BookError::NotInStock.into(),
            Self::BookNotExists(_) => api::book::BookError::NotExists.into(),
            Self::BookRetired(_) => BookError::Retired.into(),
            Self::Db(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::transit_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookBusy(_) | Self::OrderBusy(_) => {
                api::ResourceError::Busy.into()
            }
            Self::BookNotInStock(_) => BookError::NotInStock.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::OrderNotExists(_) => api::order::OrderError::NotExists.into(),
            Self::StockOverflow(_) => BookError::StockOverflow.into(),
            Self::Transition(e) => Error::new(
                http::StatusCode::CONFLICT,
                "INVALID_ORDER_TRANSITION",
                e.to_string(),
            ),
            Self::BookNotExists(_) => return None,
        })
    }
}

impl AsError for command::create_book::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::restock_book::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookBusy(_) => api::ResourceError::Busy.into(),
            Self::BookNotExists(_) => api::book::BookError::NotExists.into(),
            Self::BookRetired(_) => BookError::Retired.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::StockOverflow(_) => BookError::StockOverflow.into(),
        })
    }
}

impl AsError for command::retire_book::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BookAlreadyRetired(_) => BookError::Retired.into(),
            Self::BookBusy(_) => api::ResourceError::Busy.into(),
            Self::BookNotExists(_) => api::book::BookError::NotExists.into(),
            Self::Db(e) => return e.try_as_error(),
        })
    }
}

#[cfg(test)]
mod tests {
    use service::{
        command::transit_order::ExecutionError,
        domain::{book, order},
    };

    use crate::AsError as _;

    #[test]
    fn lifecycle_errors_map_to_statuses() {
        let not_found =
            ExecutionError::OrderNotExists(order::Id::new()).into_error();
        assert_eq!(not_found.code, "ORDER_NOT_EXISTS");
        assert_eq!(not_found.status, http::StatusCode::NOT_FOUND);

        let denied = order::State::Declined
            .transition(order::State::Taken)
            .unwrap_err();
        let conflict = ExecutionError::Transition(denied).into_error();
        assert_eq!(conflict.code, "INVALID_ORDER_TRANSITION");
        assert_eq!(conflict.status, http::StatusCode::CONFLICT);
        assert_eq!(
            conflict.message,
            "cannot change order state from declined to taken: \
                     order is closed",
        );

        let empty =
            ExecutionError::BookNotInStock(book::Id::new()).into_error();
        assert_eq!(empty.code, "BOOK_NOT_IN_STOCK");
        assert_eq!(empty.status, http::StatusCode::CONFLICT);

        let missing =
            ExecutionError::BookNotExists(book::Id::new()).into_error();
        assert_eq!(missing.code, "INTERNAL_SERVER_ERROR");
    }
}
