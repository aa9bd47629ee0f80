//! In-process [`Database`] implementation.
//!
//! Keeps everything in the process memory, so is suitable for embedding the
//! [`Service`] without a database server, and for testing it.
//!
//! [`Service`]: crate::Service

pub mod client;
mod impls;

use std::{collections::HashMap, hash::Hash, time::Duration};

use derive_more::{Deref, Display, Error as StdError};

use crate::domain::{book, order, Book, Order};
#[cfg(doc)]
use crate::infra::Database;

pub use self::client::{Connection, NonTx, Tx};

/// In-process [`Database`] client.
#[derive(Clone, Debug, Deref)]
pub struct Memory<C = NonTx>(C);

impl Memory {
    /// Creates a new empty [`Memory`] store, giving up on acquiring locks
    /// after the provided `lock_timeout`.
    #[must_use]
    pub fn new(lock_timeout: Duration) -> Self {
        Self(NonTx::new(lock_timeout))
    }
}

/// In-process database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Lock is held by another transaction for longer than allowed.
    #[display("Timed out acquiring a lock")]
    LockTimeout,

    /// Transaction is used after being committed.
    #[display("Transaction is already committed")]
    TxFinished,
}

/// Stored data.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    /// Stored [`Book`]s.
    books: HashMap<book::Id, Book>,

    /// Stored [`Order`]s.
    orders: HashMap<order::Id, Order>,
}

impl Tables {
    /// Overwrites these [`Tables`] with the records of the `other` ones.
    fn merge(&mut self, other: Self) {
        let Self { books, orders } = other;
        self.books.extend(books);
        self.orders.extend(orders);
    }
}

/// Key of a lock.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    /// Lock of a [`Book`].
    Book(book::Id),

    /// Lock of an [`Order`].
    Order(order::Id),
}

/// Value stored in [`Tables`].
pub trait Record: Clone {
    /// Type of this [`Record`]'s ID.
    type Id: Copy + Eq + Hash;

    /// Returns ID of this [`Record`].
    fn id(&self) -> Self::Id;

    /// Returns the lock [`Key`] of the [`Record`] with the provided ID.
    fn key(id: Self::Id) -> Key;

    /// Returns the table of this [`Record`] type.
    fn table(tables: &Tables) -> &HashMap<Self::Id, Self>;

    /// Returns the mutable table of this [`Record`] type.
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Self::Id, Self>;
}

impl Record for Book {
    type Id = book::Id;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn key(id: Self::Id) -> Key {
        Key::Book(id)
    }

    fn table(tables: &Tables) -> &HashMap<Self::Id, Self> {
        &tables.books
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Self::Id, Self> {
        &mut tables.books
    }
}

impl Record for Order {
    type Id = order::Id;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn key(id: Self::Id) -> Key {
        Key::Order(id)
    }

    fn table(tables: &Tables) -> &HashMap<Self::Id, Self> {
        &tables.orders
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Self::Id, Self> {
        &mut tables.orders
    }
}
