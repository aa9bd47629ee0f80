//! [`Order`] definitions.

use common::{define_kind, DateOf, Days};
use derive_more::{Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{book, user};

/// Request of a user to borrow a [`Book`].
///
/// [`Order`]s are never deleted and stay as a history of borrowing.
///
/// [`Book`]: crate::domain::Book
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    /// ID of this [`Order`].
    pub id: Id,

    /// ID of the ordered [`Book`].
    ///
    /// [`Book`]: crate::domain::Book
    pub book_id: book::Id,

    /// ID of the user who placed this [`Order`].
    pub user_id: user::Id,

    /// [`RentalKind`] of this [`Order`].
    pub rental_kind: RentalKind,

    /// [`StartDate`] when this [`Order`] was placed.
    pub start_date: StartDate,

    /// [`DueDate`] by which the ordered book is expected back.
    pub due_date: DueDate,

    /// [`ReturnDate`] when the ordered book was returned, if it was.
    pub return_date: Option<ReturnDate>,

    /// Current [`State`] of this [`Order`].
    pub state: State,
}

impl Order {
    /// Creates a new [`State::Placed`] [`Order`] starting today.
    #[must_use]
    pub fn place(book_id: book::Id, user_id: user::Id, term: Term) -> Self {
        let start_date = StartDate::today();
        Self {
            id: Id::new(),
            book_id,
            user_id,
            rental_kind: term.kind(),
            start_date,
            due_date: (start_date + term.days()).coerce(),
            return_date: None,
            state: State::Placed,
        }
    }
}

/// ID of an [`Order`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Kind of a book rental."]
    enum RentalKind {
        #[doc = "Reading inside the library's reading hall, within a day."]
        ToReadingHall = 1,

        #[doc = "Loan out of the library for several weeks."]
        OutOfLibrary = 2,
    }
}

/// Rental term of an [`Order`]: its [`RentalKind`] along with the number of
/// [`Days`] the book is borrowed for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Term {
    /// [`RentalKind`] of this [`Term`].
    kind: RentalKind,

    /// Number of [`Days`] of this [`Term`].
    days: Days,
}

impl Term {
    /// Numbers of days an [`RentalKind::OutOfLibrary`] loan may last.
    pub const LOAN_DAYS: [u16; 3] = [7, 14, 21];

    /// Creates a new [`Term`] if the provided `days` are allowed for the
    /// provided [`RentalKind`]:
    /// - [`RentalKind::ToReadingHall`] lasts exactly 0 days;
    /// - [`RentalKind::OutOfLibrary`] lasts one of [`Term::LOAN_DAYS`].
    #[must_use]
    pub fn new(kind: RentalKind, days: Days) -> Option<Self> {
        let is_valid = match kind {
            RentalKind::ToReadingHall => days == Days::ZERO,
            RentalKind::OutOfLibrary => Self::LOAN_DAYS.contains(&days.get()),
        };
        is_valid.then_some(Self { kind, days })
    }

    /// Returns [`RentalKind`] of this [`Term`].
    #[must_use]
    pub const fn kind(self) -> RentalKind {
        self.kind
    }

    /// Returns number of [`Days`] of this [`Term`].
    #[must_use]
    pub const fn days(self) -> Days {
        self.days
    }
}

define_kind! {
    #[doc = "State of an [`Order`] in its lifecycle."]
    enum State {
        #[doc = "Placed by a reader, awaiting a librarian's decision."]
        Placed = 1,

        #[doc = "Approved by a librarian, a copy is reserved."]
        Approved = 2,

        #[doc = "Declined by a librarian."]
        Declined = 3,

        #[doc = "The book was handed over to the reader."]
        Taken = 4,

        #[doc = "The book was returned to the library."]
        Returned = 5,
    }
}

impl State {
    /// Permitted `(from, to)` transitions.
    const TRANSITIONS: [(Self, Self); 4] = [
        (Self::Placed, Self::Approved),
        (Self::Placed, Self::Declined),
        (Self::Approved, Self::Taken),
        (Self::Taken, Self::Returned),
    ];

    /// Indicates whether no transition is possible out of this [`State`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Declined | Self::Returned)
    }

    /// Checks whether this [`State`] may be changed to the `to` one.
    ///
    /// Stock availability is not considered here, as it depends on the
    /// ordered book.
    ///
    /// # Errors
    ///
    /// With the [`TransitionError`] describing the first violated rule.
    pub fn transition(self, to: Self) -> Result<(), TransitionError> {
        use TransitionDenial as D;

        if Self::TRANSITIONS.contains(&(self, to)) {
            return Ok(());
        }

        let reason = if self.is_terminal() {
            D::Terminal
        } else if to.u8() <= self.u8() {
            D::Regress
        } else if self == Self::Approved && to == Self::Declined {
            D::ApprovedNotDeclinable
        } else if to == Self::Returned {
            D::NotTaken
        } else {
            D::NotApproved
        };
        Err(TransitionError {
            from: self,
            to,
            reason,
        })
    }
}

/// Error of an illegal [`State`] transition.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("cannot change order state from {from} to {to}: {reason}")]
pub struct TransitionError {
    /// [`State`] the [`Order`] is in.
    pub from: State,

    /// [`State`] the [`Order`] was requested to move to.
    pub to: State,

    /// [`TransitionDenial`] reason.
    pub reason: TransitionDenial,
}

/// Reason of a [`State`] transition being denied.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum TransitionDenial {
    /// [`Order`] is declined or returned already.
    #[display("order is closed")]
    Terminal,

    /// Requested [`State`] doesn't follow the current one.
    #[display("would regress")]
    Regress,

    /// Approved [`Order`] cannot be declined anymore.
    #[display("approved order cannot be declined")]
    ApprovedNotDeclinable,

    /// Only taken books can be returned.
    #[display("book was never taken")]
    NotTaken,

    /// Only approved [`Order`]s can be handed over.
    #[display("order is not approved")]
    NotApproved,
}

/// Marker type indicating the date an [`Order`] is due.
#[derive(Clone, Copy, Debug)]
pub struct Due;

/// Marker type indicating the date an [`Order`] was placed.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type indicating the date an ordered book was returned.
#[derive(Clone, Copy, Debug)]
pub struct Return;

/// Date when an [`Order`] was placed.
pub type StartDate = DateOf<(Order, Start)>;

/// Date by which an ordered book is expected back.
pub type DueDate = DateOf<(Order, Due)>;

/// Date when an ordered book was returned.
pub type ReturnDate = DateOf<(Order, Return)>;

#[cfg(test)]
mod tests {
    use common::Days;

    use crate::domain::{book, user};

    use super::{Order, RentalKind, State, Term, TransitionDenial};

    #[test]
    fn term_validation() {
        use RentalKind as K;

        assert!(Term::new(K::ToReadingHall, Days::ZERO).is_some());
        assert!(Term::new(K::ToReadingHall, Days::new(7)).is_none());

        assert!(Term::new(K::OutOfLibrary, Days::ZERO).is_none());
        for days in [7, 14, 21] {
            assert!(Term::new(K::OutOfLibrary, Days::new(days)).is_some());
        }
        for days in [1, 6, 8, 15, 28] {
            assert!(Term::new(K::OutOfLibrary, Days::new(days)).is_none());
        }
    }

    #[test]
    fn placed_order_dates() {
        let term = Term::new(RentalKind::OutOfLibrary, Days::new(14)).unwrap();
        let order = Order::place(book::Id::new(), user::Id::new(), term);

        assert_eq!(order.state, State::Placed);
        assert_eq!(order.rental_kind, RentalKind::OutOfLibrary);
        assert_eq!(order.due_date.days_since(&order.start_date), 14);
        assert_eq!(order.return_date, None);
    }

    #[test]
    fn reading_hall_order_is_due_the_same_day() {
        let term = Term::new(RentalKind::ToReadingHall, Days::ZERO).unwrap();
        let order = Order::place(book::Id::new(), user::Id::new(), term);

        assert_eq!(order.due_date.coerce::<()>(), order.start_date.coerce());
    }

    #[test]
    fn permitted_transitions() {
        use State as S;

        for (from, to) in [
            (S::Placed, S::Approved),
            (S::Placed, S::Declined),
            (S::Approved, S::Taken),
            (S::Taken, S::Returned),
        ] {
            assert_eq!(from.transition(to), Ok(()), "{from} -> {to}");
        }
    }

    #[test]
    fn every_other_transition_is_denied() {
        use State as S;
        use TransitionDenial as D;

        let expected = |from, to| match (from, to) {
            (S::Declined | S::Returned, _) => D::Terminal,
            (S::Placed, S::Placed)
            | (S::Approved, S::Placed | S::Approved)
            | (S::Taken, S::Placed | S::Approved | S::Declined | S::Taken) => {
                D::Regress
            }
            (S::Approved, S::Declined) => D::ApprovedNotDeclinable,
            (S::Placed | S::Approved, S::Returned) => D::NotTaken,
            (S::Placed, S::Taken) => D::NotApproved,
            (S::Placed, S::Approved | S::Declined)
            | (S::Approved, S::Taken)
            | (S::Taken, S::Returned) => unreachable!("permitted"),
        };

        for &from in S::ALL {
            for &to in S::ALL {
                let Err(e) = from.transition(to) else {
                    continue;
                };
                assert_eq!(e.from, from);
                assert_eq!(e.to, to);
                assert_eq!(e.reason, expected(from, to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn transition_error_message() {
        let e = State::Placed.transition(State::Placed).unwrap_err();
        assert_eq!(
            e.to_string(),
            "cannot change order state from placed to placed: would regress",
        );

        let e = State::Approved.transition(State::Declined).unwrap_err();
        assert_eq!(
            e.to_string(),
            "cannot change order state from approved to declined: approved \
             order cannot be declined",
        );
    }

    #[cfg(feature = "postgres")]
    mod postgres {
        use postgres_types::{private::BytesMut, FromSql as _, ToSql as _, Type};

        use super::{RentalKind, State};

        #[test]
        fn state_is_stored_as_its_number() {
            let mut buf = BytesMut::new();
            State::Returned.to_sql(&Type::INT2, &mut buf).unwrap();

            assert_eq!(i16::from_sql(&Type::INT2, &buf).unwrap(), 5);
            assert_eq!(
                State::from_sql(&Type::INT2, &buf).unwrap(),
                State::Returned,
            );
        }

        #[test]
        fn rental_kind_rejects_unknown_number() {
            let mut buf = BytesMut::new();
            9_i16.to_sql(&Type::INT2, &mut buf).unwrap();

            assert!(RentalKind::from_sql(&Type::INT2, &buf).is_err());
        }
    }
}
