//! Backing stores for named, append-only tables.
//!
//! The dispatcher only ever talks to [`TableStore`]; which store sits behind it
//! is decided once at startup.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, TableSnapshot};
pub use postgres::PgTableStore;
pub use store::{TableRef, TableStore};
