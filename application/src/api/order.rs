//! [`Order`]-related definitions.

use common::{Date, Days};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain::{self, order};
use uuid::Uuid;

use crate::{api, define_error, Context, Error};

/// An order of a `Book`.
#[derive(Clone, Debug)]
pub struct Order {
    /// Underlying [`domain::Order`].
    order: domain::Order,

    /// Ordered [`api::Book`], loaded lazily.
    book: api::Book,
}

impl From<domain::Order> for Order {
    fn from(order: domain::Order) -> Self {
        Self {
            #[expect(unsafe_code, reason = "ordered book is never deleted")]
            book: unsafe { api::Book::new_unchecked(order.book_id) },
            order,
        }
    }
}

/// An order of a `Book`.
#[graphql_object(context = Context)]
impl Order {
    /// Unique identifier of this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.order.id.into()
    }

    /// Ordered `Book`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.book",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn book(&self) -> api::Book {
        self.book.clone()
    }

    /// ID of the user who placed this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.userId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn user_id(&self) -> UserId {
        self.order.user_id.into()
    }

    /// Kind of the rental requested by this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.rentalKind",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn rental_kind(&self) -> RentalKind {
        self.order.rental_kind.into()
    }

    /// `Date` when this `Order` was placed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.startDate",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn start_date(&self) -> Date {
        self.order.start_date.coerce()
    }

    /// `Date` when the ordered `Book` is due back.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.dueDate",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn due_date(&self) -> Date {
        self.order.due_date.coerce()
    }

    /// `Date` when the ordered `Book` was returned, if it was.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.returnDate",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn return_date(&self) -> Option<Date> {
        self.order.return_date.map(|d| d.coerce())
    }

    /// Current state of this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.state",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn state(&self) -> State {
        self.order.state.into()
    }
}

/// Unique identifier of an `Order`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(order::Id)]
#[into(order::Id)]
#[graphql(name = "OrderId", transparent)]
pub struct Id(Uuid);

/// Unique identifier of a user, as known to the identity provider.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::user::Id)]
#[into(domain::user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct UserId(Uuid);

/// Kind of a `Book` rental.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "RentalKind")]
pub enum RentalKind {
    /// Reading inside the reading hall, returned the same day.
    ToReadingHall,

    /// Loan out of the library for 7, 14 or 21 days.
    OutOfLibrary,
}

impl From<order::RentalKind> for RentalKind {
    fn from(kind: order::RentalKind) -> Self {
        use order::RentalKind as K;
        match kind {
            K::ToReadingHall => Self::ToReadingHall,
            K::OutOfLibrary => Self::OutOfLibrary,
        }
    }
}

impl From<RentalKind> for order::RentalKind {
    fn from(kind: RentalKind) -> Self {
        match kind {
            RentalKind::ToReadingHall => Self::ToReadingHall,
            RentalKind::OutOfLibrary => Self::OutOfLibrary,
        }
    }
}

/// State of an `Order`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "OrderState")]
pub enum State {
    /// Placed and waiting for a librarian's decision.
    Placed,

    /// Approved, with a copy of the `Book` reserved.
    Approved,

    /// Declined by a librarian.
    Declined,

    /// `Book` is taken by the reader.
    Taken,

    /// `Book` is returned back to the library.
    Returned,
}

impl From<order::State> for State {
    fn from(state: order::State) -> Self {
        use order::State as S;
        match state {
            S::Placed => Self::Placed,
            S::Approved => Self::Approved,
            S::Declined => Self::Declined,
            S::Taken => Self::Taken,
            S::Returned => Self::Returned,
        }
    }
}

/// Builds an [`order::Term`] out of the provided GraphQL arguments.
///
/// # Errors
///
/// If the number of `days` is not allowed for the [`RentalKind`].
pub(crate) fn term(kind: RentalKind, days: i32) -> Result<order::Term, Error> {
    u16::try_from(days)
        .ok()
        .and_then(|d| order::Term::new(kind.into(), Days::new(d)))
        .ok_or_else(|| TermError::Invalid.into())
}

define_error! {
    /// Errors of accessing `Order`s.
    enum OrderError {
        NotExists(NOT_FOUND, "ORDER_NOT_EXISTS") =>
            "`Order` with the specified ID does not exist",
    }
}

define_error! {
    /// Errors of a requested rental term.
    enum TermError {
        Invalid(BAD_REQUEST, "INVALID_RENTAL_TERM") =>
            "Reading hall rentals last 0 days, loans out of the \
             library last 7, 14 or 21 days",
    }
}

#[cfg(test)]
mod tests {
    use service::domain::order;

    use super::{term, RentalKind};

    #[test]
    fn accepts_allowed_terms() {
        let t = term(RentalKind::ToReadingHall, 0).unwrap();
        assert_eq!(t.kind(), order::RentalKind::ToReadingHall);
        assert_eq!(t.days().get(), 0);

        for days in [7, 14, 21] {
            let t = term(RentalKind::OutOfLibrary, days).unwrap();
            assert_eq!(t.kind(), order::RentalKind::OutOfLibrary);
            assert_eq!(i32::from(t.days().get()), days);
        }
    }

    #[test]
    fn rejects_other_terms() {
        for (kind, days) in [
            (RentalKind::ToReadingHall, 1),
            (RentalKind::ToReadingHall, 7),
            (RentalKind::OutOfLibrary, 0),
            (RentalKind::OutOfLibrary, 10),
            (RentalKind::OutOfLibrary, -7),
            (RentalKind::OutOfLibrary, 65_557),
        ] {
            let err = term(kind, days).unwrap_err();
            assert_eq!(err.code, "INVALID_RENTAL_TERM", "{kind:?} {days}");
            assert_eq!(err.status, http::StatusCode::BAD_REQUEST);
        }
    }
}
