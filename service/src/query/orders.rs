//! [`Query`] collection related to the multiple [`Order`]s.

use common::operations::By;

use crate::domain::{user, Order};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`Order`]s, oldest first.
pub type All = DatabaseQuery<By<Vec<Order>, ()>>;

/// Queries all the [`Order`]s placed by a user, oldest first.
pub type OfUser = DatabaseQuery<By<Vec<Order>, user::Id>>;
