//! [`Command`] definition.

pub mod authorize_session;
pub mod create_book;
pub mod create_order;
pub mod restock_book;
pub mod retire_book;
pub mod transit_order;

use tracerr::Traced;

use crate::infra::database;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_session::AuthorizeSession,
    create_book::CreateBook,
    create_order::CreateOrder,
    restock_book::RestockBook,
    retire_book::RetireBook,
    transit_order::{
        ApproveOrder, CollectOrder, DeclineOrder, ReturnOrder, TransitOrder,
    },
};

/// Converts an error of acquiring a lock into the `E`rror of a [`Command`].
///
/// The provided `busy` error is returned if the lock wasn't acquired in time.
fn lock_error<E>(busy: E) -> impl FnOnce(Traced<database::Error>) -> Traced<E>
where
    E: From<database::Error>,
{
    move |e| {
        if e.as_ref().is_lock_timeout() {
            tracerr::new!(busy)
        } else {
            tracerr::map_from(e)
        }
    }
}
