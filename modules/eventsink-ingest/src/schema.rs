//! Header widening.
//!
//! The delta is computed against a copy of the current header and only then
//! written to the store, so a row is never projected against a half-applied header.

use eventsink_common::Header;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAddition {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The header rows must be projected against.
    pub header: Header,
    /// Columns to write to the store, in position order.
    pub added: Vec<ColumnAddition>,
}

impl Reconciliation {
    pub fn is_widened(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Union the current header with an event's keys. Unseen keys are appended in
/// the event's key order; existing columns keep their positions. An empty
/// header is bootstrapped entirely from the keys.
pub fn reconcile<'a, I>(current: &Header, keys: I) -> Reconciliation
where
    I: IntoIterator<Item = &'a str>,
{
    let mut header = current.clone();
    let mut added = Vec::new();

    for key in keys {
        if key.is_empty() || header.contains(key) {
            continue;
        }
        if let Ok(index) = header.push(key) {
            added.push(ColumnAddition {
                index,
                name: key.to_string(),
            });
        }
    }

    Reconciliation { header, added }
}
