//! Calendar date utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, fmt, marker::PhantomData, ops};

use derive_more::{Debug, Display, Error, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{format_description::FormatItem, macros::format_description};

/// [ISO 8601] calendar date format (`YYYY-MM-DD`).
///
/// [ISO 8601]: https://en.wikipedia.org/wiki/ISO_8601
const ISO_8601: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Untyped calendar date.
pub type Date = DateOf;

/// Calendar date in UTC, without a time component.
///
/// `Of` type parameter describes what the date means (when something started,
/// is due, etc.), so dates of different meaning cannot be mixed accidentally.
#[derive(Debug)]
pub struct DateOf<Of: ?Sized = ()> {
    /// Inner representation of the date.
    inner: time::Date,

    /// Type parameter describing the kind of date.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateOf<Of> {
    /// Returns the current UTC date.
    #[must_use]
    pub fn today() -> Self {
        Self::from(time::OffsetDateTime::now_utc().date())
    }

    /// Parses a [`DateOf`] from the provided [ISO 8601] string (`YYYY-MM-DD`).
    ///
    /// # Errors
    ///
    /// If the string is not a valid [ISO 8601] calendar date.
    ///
    /// [ISO 8601]: https://en.wikipedia.org/wiki/ISO_8601
    pub fn from_iso8601(input: &str) -> Result<Self, ParseError> {
        time::Date::parse(input, ISO_8601)
            .map(Self::from)
            .map_err(ParseError)
    }

    /// Returns this [`DateOf`] as an [ISO 8601] string (`YYYY-MM-DD`).
    ///
    /// [ISO 8601]: https://en.wikipedia.org/wiki/ISO_8601
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn to_iso8601(&self) -> String {
        self.inner.format(ISO_8601).unwrap_or_else(|e| {
            panic!("cannot format `Date` as ISO 8601: {e}")
        })
    }

    /// Adds the provided number of [`Days`] to this [`DateOf`].
    ///
    /// [`None`] is returned on calendar overflow.
    #[must_use]
    pub fn checked_add(self, days: Days) -> Option<Self> {
        self.inner
            .checked_add(time::Duration::days(i64::from(days.0)))
            .map(Self::from)
    }

    /// Returns the number of days passed from `earlier` to this [`DateOf`].
    ///
    /// Negative if `earlier` is actually later.
    #[must_use]
    pub fn days_since<Other: ?Sized>(&self, earlier: &DateOf<Other>) -> i64 {
        (self.inner - earlier.inner).whole_days()
    }

    /// Coerces one kind of [`DateOf`] into another.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateOf<NewOf> {
        DateOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

/// Error of parsing a [`DateOf`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("invalid ISO 8601 date: {_0}")]
pub struct ParseError(time::error::Parse);

/// Number of calendar days.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Hash, Into, Ord, PartialEq,
    PartialOrd,
)]
pub struct Days(u16);

impl Days {
    /// Zero days.
    pub const ZERO: Self = Self(0);

    /// Creates a new [`Days`] amount.
    #[must_use]
    pub const fn new(days: u16) -> Self {
        Self(days)
    }

    /// Returns the number of days as a plain integer.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl<Of: ?Sized> Copy for DateOf<Of> {}
impl<Of: ?Sized> Clone for DateOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateOf<Of> {}
impl<Of: ?Sized> PartialEq for DateOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> Ord for DateOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> fmt::Display for DateOf<Of> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl<Of: ?Sized> From<time::Date> for DateOf<Of> {
    fn from(inner: time::Date) -> Self {
        Self {
            inner,
            _of: PhantomData,
        }
    }
}

impl<Of: ?Sized> From<DateOf<Of>> for time::Date {
    fn from(date: DateOf<Of>) -> Self {
        date.inner
    }
}

impl<Of: ?Sized> ops::Add<Days> for DateOf<Of> {
    type Output = Self;

    fn add(self, rhs: Days) -> Self::Output {
        self.checked_add(rhs).expect("date overflow")
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateOf<Of> {
    accepts!(DATE);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::Date::from_sql(ty, raw).map(Self::from)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateOf<Of> {
    accepts!(DATE);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use super::DateOf;

    impl<Of: ?Sized> Serialize for DateOf<Of> {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    impl<'de, Of: ?Sized> Deserialize<'de> for DateOf<Of> {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            Self::from_iso8601(&s).map_err(D::Error::custom)
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Calendar date in a `YYYY-MM-DD` format.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Date = crate::Date;

    impl Date {
        fn to_output<S: ScalarValue>(d: &Date) -> Value<S> {
            Value::scalar(d.to_iso8601())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Date` input scalar from non-string \
                         value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_iso8601(s).map_err(|e| {
                        format!("Cannot parse `Date` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Date, Days};

    #[test]
    fn parses_and_formats_iso8601() {
        let date = Date::from_iso8601("2024-02-28").unwrap();
        assert_eq!(date.to_iso8601(), "2024-02-28");
        assert_eq!(date.to_string(), "2024-02-28");

        assert!(Date::from_iso8601("2024-02-30").is_err());
        assert!(Date::from_iso8601("28.02.2024").is_err());
        assert!(Date::from_iso8601("").is_err());
    }

    #[test]
    fn adds_days_across_months() {
        let date = Date::from_iso8601("2024-02-28").unwrap();

        assert_eq!(date + Days::ZERO, date);
        assert_eq!((date + Days::new(1)).to_iso8601(), "2024-02-29");
        assert_eq!((date + Days::new(7)).to_iso8601(), "2024-03-06");
        assert_eq!((date + Days::new(21)).to_iso8601(), "2024-03-20");
    }

    #[test]
    fn counts_days_between() {
        let start = Date::from_iso8601("2024-12-25").unwrap();
        let end = Date::from_iso8601("2025-01-08").unwrap();

        assert_eq!(end.days_since(&start), 14);
        assert_eq!(start.days_since(&end), -14);
        assert!(start < end);
    }
}
