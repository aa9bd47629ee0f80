//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Services, queries and database operations are all expressed as
/// [`Handler`]s of a specific `Args` type, so a single value may handle
/// many different operations.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}

