//! [`Query`] collection related to the multiple [`Book`]s.

use common::operations::By;

use crate::domain::Book;
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`Book`]s of the catalog, ordered by their titles.
pub type All = DatabaseQuery<By<Vec<Book>, ()>>;
