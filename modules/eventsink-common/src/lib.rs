//! Shared vocabulary for the event sink: field and cell values, table headers,
//! the canonical cell codec, the domain catalog, and process configuration.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod types;

pub use catalog::{TableCatalog, DEFAULT_DOMAIN};
pub use codec::{canonical_json, cell_for, iso_timestamp};
pub use config::AppConfig;
pub use types::*;
