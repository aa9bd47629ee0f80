//! [`Database`]-related implementations.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;
pub use self::memory::Memory;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Indicates whether this [`Error`] is caused by failing to acquire a
    /// lock in time.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        match self {
            Self::Memory(e) => matches!(e, memory::Error::LockTimeout),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_lock_timeout(),
        }
    }
}
