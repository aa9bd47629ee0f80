//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Order` with the specified ID.
    ///
    /// Readers may see their own `Order`s only.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `ORDER_NOT_EXISTS` - the `Order` with the specified ID does not exist
    ///                        or is not visible to the current user.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "order",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn order(
        id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let session = ctx.current_session().await?;

        let order = ctx
            .service()
            .execute(query::order::ById(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        if !session.role.is_staff() && order.user_id != session.user_id {
            return Err(api::order::OrderError::NotExists.into())
                .map_err(ctx.error());
        }

        Ok(order.into())
    }

    /// Returns the `Order`s visible to the current user, oldest first.
    ///
    /// Librarians and admins see all the `Order`s, while readers see their
    /// own ones only.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "orders",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn orders(ctx: &Context) -> Result<Vec<api::Order>, Error> {
        let session = ctx.current_session().await?;

        let orders = if session.role.is_staff() {
            ctx.service().execute(query::orders::All::by(())).await
        } else {
            ctx.service()
                .execute(query::orders::OfUser::by(session.user_id))
                .await
        };

        orders
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|orders| orders.into_iter().map(Into::into).collect())
    }

    /// Returns the `Book` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized;
    /// - `BOOK_NOT_EXISTS` - the `Book` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "book",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn book(
        id: api::book::Id,
        ctx: &Context,
    ) -> Result<api::Book, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(query::book::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::book::BookError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns all the `Book`s of the catalog, ordered by their titles.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authorized.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "books",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn books(ctx: &Context) -> Result<Vec<api::Book>, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(query::books::All::by(()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|books| books.into_iter().map(Into::into).collect())
    }
}

impl AsError for query::order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::OrderNotExists(_) => {
                Some(api::order::OrderError::NotExists.into())
            }
        }
    }
}
