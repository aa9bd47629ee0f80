//! GraphQL API definitions.

pub mod book;
mod mutation;
pub mod order;
mod query;

use juniper::EmptySubscription;

use crate::{define_error, Context};

pub use self::{book::Book, mutation::Mutation, order::Order, query::Query};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

/// Creates a new [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}

define_error! {
    /// Errors of insufficient privileges.
    enum PrivilegeError {
        Staff(FORBIDDEN, "NOT_STAFF") =>
            "Authenticated user must be a librarian or an admin",
    }
}

define_error! {
    /// Errors of accessing contended resources.
    enum ResourceError {
        Busy(CONFLICT, "RESOURCE_BUSY") =>
            "Requested resource is being changed concurrently, try \
             again later",
    }
}
