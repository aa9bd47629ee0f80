//! [`Book`] definitions.

use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Book of the library catalog, as an inventory record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Book {
    /// ID of this [`Book`].
    pub id: Id,

    /// [`Title`] of this [`Book`].
    pub title: Title,

    /// [`Amount`] of copies available to be approved for loan.
    pub amount: Amount,

    /// Indicator whether this [`Book`] is retired from the catalog.
    ///
    /// Retired [`Book`]s are kept for the history of orders, but cannot be
    /// ordered anymore.
    pub is_retired: bool,
}

impl Book {
    /// Indicates whether this [`Book`] may be ordered right now.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.is_retired && self.amount.in_stock()
    }
}

/// ID of a [`Book`].
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

/// Title of a [`Book`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title && !title.is_empty() && title.len() <= 512
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Non-negative number of [`Book`] copies in stock.
///
/// Arithmetic never goes above [`Amount::MAX`], so every [`Amount`] produced
/// by it fits into a signed 32-bit storage column.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct Amount(u32);

impl Amount {
    /// No copies in stock.
    pub const ZERO: Self = Self(0);

    /// The largest [`Amount`] that [`Amount::checked_add()`] may produce.
    pub const MAX: Self = Self(i32::MAX.unsigned_abs());

    /// Indicates whether at least one copy is in stock.
    #[must_use]
    pub const fn in_stock(self) -> bool {
        self.0 > 0
    }

    /// Returns this [`Amount`] with one copy taken out.
    ///
    /// [`None`] is returned if there is nothing in stock.
    #[must_use]
    pub const fn decremented(self) -> Option<Self> {
        match self.0.checked_sub(1) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Returns this [`Amount`] with one copy put back.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub const fn incremented(self) -> Option<Self> {
        self.checked_add(Self(1))
    }

    /// Returns the sum of this and the `other` [`Amount`].
    ///
    /// [`None`] is returned if the sum exceeds [`Amount::MAX`].
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) if v <= Self::MAX.0 => Some(Self(v)),
            _ => None,
        }
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    //! [`Amount`] storage as `INT4`.

    use std::error::Error as StdError;

    use postgres_types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    };

    use super::Amount;

    impl FromSql<'_> for Amount {
        accepts!(INT4);

        fn from_sql(
            ty: &Type,
            raw: &[u8],
        ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
            Ok(Self(u32::try_from(i32::from_sql(ty, raw)?)?))
        }
    }

    impl ToSql for Amount {
        accepts!(INT4);
        to_sql_checked!();

        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
            i32::try_from(self.0)?.to_sql(ty, w)
        }
    }

    #[cfg(test)]
    mod tests {
        use postgres_types::{private::BytesMut, FromSql as _, ToSql as _, Type};

        use super::Amount;

        #[test]
        fn stored_as_int4() {
            for amount in [Amount::ZERO, Amount::from(7), Amount::MAX] {
                let mut buf = BytesMut::new();
                amount.to_sql(&Type::INT4, &mut buf).unwrap();

                assert_eq!(Amount::from_sql(&Type::INT4, &buf).unwrap(), amount);
            }
        }

        #[test]
        fn negative_column_value_is_rejected() {
            let mut buf = BytesMut::new();
            (-1_i32).to_sql(&Type::INT4, &mut buf).unwrap();

            assert!(Amount::from_sql(&Type::INT4, &buf).is_err());
        }

        #[test]
        fn only_int4_is_accepted() {
            assert!(<Amount as postgres_types::ToSql>::accepts(&Type::INT4));
            assert!(!<Amount as postgres_types::ToSql>::accepts(&Type::INT8));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Amount, Book, Id, Title};

    #[test]
    fn amount_never_goes_negative() {
        assert_eq!(Amount::ZERO.decremented(), None);
        assert_eq!(Amount::from(1).decremented(), Some(Amount::ZERO));
        assert_eq!(Amount::ZERO.incremented(), Some(Amount::from(1)));
        assert_eq!(Amount::from(u32::MAX).incremented(), None);
    }

    #[test]
    fn amount_stays_within_signed_range() {
        let max = Amount::MAX;
        assert_eq!(u32::from(max), 2_147_483_647);
        assert_eq!(max.incremented(), None);
        assert_eq!(Amount::from(1).checked_add(max), None);
        assert_eq!(
            Amount::from(2_147_483_646).incremented(),
            Some(Amount::MAX),
        );
        assert_eq!(
            Amount::from(1_000_000_000).checked_add(Amount::from(1_500_000_000)),
            None,
        );
    }

    #[test]
    fn title_validation() {
        assert!(Title::new("Dune").is_some());
        assert!(Title::new("").is_none());
        assert!(Title::new(" Dune").is_none());
        assert!(Title::new("x".repeat(513)).is_none());
    }

    #[test]
    fn availability() {
        let mut book = Book {
            id: Id::new(),
            title: Title::new("Dune").unwrap(),
            amount: Amount::from(1),
            is_retired: false,
        };
        assert!(book.is_available());

        book.amount = Amount::ZERO;
        assert!(!book.is_available());

        book.amount = Amount::from(3);
        book.is_retired = true;
        assert!(!book.is_available());
    }
}
