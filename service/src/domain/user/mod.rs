//! User definitions.
//!
//! Users themselves are owned by an external identity provider, so only
//! their identity and [`Role`] are known here.

pub mod session;

use common::define_kind;
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// ID of a user.
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
    PartialEq,
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
    #[doc = "Role of a user in the library."]
    enum Role {
        #[doc = "Library member borrowing books."]
        Reader = 1,

        #[doc = "Staff member handling orders and the catalog."]
        Librarian = 2,

        #[doc = "Staff member with full access."]
        Admin = 3,
    }
}

impl Role {
    /// Indicates whether this [`Role`] belongs to library staff, allowed to
    /// see all orders and to move them through their lifecycle.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Librarian | Self::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn staff_roles() {
        assert!(!Role::Reader.is_staff());
        assert!(Role::Librarian.is_staff());
        assert!(Role::Admin.is_staff());
    }

    #[test]
    fn role_representations() {
        assert_eq!(Role::Librarian.to_string(), "librarian");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("Admin ".parse::<Role>().is_err());

        for role in Role::ALL {
            assert_eq!(Role::from_u8(role.u8()), Some(*role));
        }
        assert_eq!(Role::from_u8(0), None);
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn role_is_stored_as_int2() {
        use postgres_types::{private::BytesMut, FromSql as _, ToSql as _, Type};

        for role in Role::ALL {
            let mut buf = BytesMut::new();
            role.to_sql(&Type::INT2, &mut buf).unwrap();

            assert_eq!(Role::from_sql(&Type::INT2, &buf).unwrap(), *role);
        }

        let mut buf = BytesMut::new();
        4_i16.to_sql(&Type::INT2, &mut buf).unwrap();
        assert!(Role::from_sql(&Type::INT2, &buf).is_err());
    }
}
