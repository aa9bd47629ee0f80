//! Domain definitions.

pub mod book;
pub mod order;
pub mod user;

pub use self::{book::Book, order::Order};
