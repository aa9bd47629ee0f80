//! [`Book`]-related definitions.

use std::future;

use common::Handler as _;
use derive_more::{AsRef, Display, From, Into};
use juniper::{
    graphql_object, GraphQLScalar, InputValue, ScalarValue, Value,
};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, define_error, AsError, Context, Error};

/// A book of the library catalog.
#[derive(Clone, Debug)]
pub struct Book {
    /// ID of this [`Book`].
    id: Id,

    /// Underlying [`domain::Book`].
    book: OnceCell<domain::Book>,
}

impl From<domain::Book> for Book {
    fn from(book: domain::Book) -> Self {
        Self {
            id: book.id.into(),
            book: OnceCell::new_with(Some(book)),
        }
    }
}

impl Book {
    /// Creates a new [`Book`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Book`] with the provided ID exists,
    /// otherwise accessing this [`Book`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            book: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Book`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Book`] doesn't exist.
    async fn book(&self, ctx: &Context) -> Result<&domain::Book, Error> {
        let id = self.id.into();
        self.book
            .get_or_try_init(|| async {
                ctx.service()
                    .execute(query::book::ById::by(id))
                    .await
                    .map_err(AsError::into_error)
                    .and_then(|b| b.ok_or_else(|| BookError::NotExists.into()))
                    .map_err(ctx.error())
            })
            .await
    }
}

/// A book of the library catalog.
#[graphql_object(context = Context)]
impl Book {
    /// Unique identifier of this `Book`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Book.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Title of this `Book`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Book.title",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn title(&self, ctx: &Context) -> Result<Title, Error> {
        Ok(self.book(ctx).await?.title.clone().into())
    }

    /// Number of copies of this `Book` available to be lent.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Book.amount",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn amount(&self, ctx: &Context) -> Result<i32, Error> {
        let amount = self.book(ctx).await?.amount;
        i32::try_from(u32::from(amount))
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Indicator whether this `Book` is retired from the catalog.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Book.isRetired",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn is_retired(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.book(ctx).await?.is_retired)
    }

    /// Indicator whether this `Book` may be ordered right now.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Book.isAvailable",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn is_available(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.book(ctx).await?.is_available())
    }
}

/// Unique identifier of a `Book`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::book::Id)]
#[into(domain::book::Id)]
#[graphql(name = "BookId", transparent)]
pub struct Id(Uuid);

/// Title of a `Book`.
///
/// Non-empty, at most 512 bytes long, without leading or trailing
/// whitespace.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "BookTitle", with = Self, parse_token(String))]
pub struct Title(domain::book::Title);

impl Title {
    fn to_output<S: ScalarValue>(title: &Self) -> Value<S> {
        Value::scalar(title.to_string())
    }

    fn from_input<S: ScalarValue>(
        input: &InputValue<S>,
    ) -> Result<Self, String> {
        let s = input.as_string_value().ok_or_else(|| {
            format!("Cannot parse `BookTitle` from non-string value: {input}")
        })?;
        domain::book::Title::new(s)
            .map(Self)
            .ok_or_else(|| format!("Invalid `BookTitle`: \"{s}\""))
    }
}

/// Converts the provided GraphQL `amount` into a [`domain::book::Amount`].
///
/// # Errors
///
/// If the `amount` is negative.
pub(crate) fn amount(amount: i32) -> Result<domain::book::Amount, Error> {
    u32::try_from(amount)
        .map(Into::into)
        .map_err(|_| InputError::NegativeAmount.into())
}

define_error! {
    /// Errors of accessing `Book`s.
    enum BookError {
        NotExists(NOT_FOUND, "BOOK_NOT_EXISTS") =>
            "`Book` with the specified ID does not exist",
    }
}

define_error! {
    /// Errors of malformed input values.
    enum InputError {
        NegativeAmount(BAD_REQUEST, "NEGATIVE_AMOUNT") =>
            "Amount of `Book` copies cannot be negative",
    }
}

#[cfg(test)]
mod tests {
    use juniper::{DefaultScalarValue, InputValue};
    use service::domain::book;

    use super::{amount, Title};

    fn title(input: &str) -> Result<Title, String> {
        Title::from_input(&InputValue::<DefaultScalarValue>::scalar(
            input.to_owned(),
        ))
    }

    #[test]
    fn title_is_validated() {
        assert_eq!(title("Dune").unwrap().to_string(), "Dune");
        assert!(title("").is_err());
        assert!(title(" Dune").is_err());
        assert!(title(&"x".repeat(513)).is_err());

        let number = InputValue::<DefaultScalarValue>::scalar(42);
        assert!(Title::from_input(&number).is_err());
    }

    #[test]
    fn amount_must_not_be_negative() {
        assert_eq!(amount(0).unwrap(), book::Amount::ZERO);
        assert_eq!(amount(3).unwrap(), book::Amount::from(3));

        let err = amount(-1).unwrap_err();
        assert_eq!(err.code, "NEGATIVE_AMOUNT");
        assert_eq!(err.status, http::StatusCode::BAD_REQUEST);
    }
}
