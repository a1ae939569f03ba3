//! Event ingestion: turns submitted payloads into rows on named tables.
//!
//! Per entry, in submission order: resolve (or create) the table, widen its
//! header with any unseen keys, project the event onto the header, append,
//! then enforce retention. All of it runs under that table's lock.

pub mod clock;
mod deadline;
pub mod dispatcher;
pub mod error;
pub mod locks;
pub mod payload;
pub mod projector;
pub mod retention;
pub mod schema;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dispatcher::{IngestConfig, IngestDispatcher, ProvisionReport, SubmitOutcome, SubmitReport};
pub use error::{IngestError, Result};
pub use locks::TableLocks;
pub use payload::{parse_submission, IncomingEvent, TIMESTAMP_FIELD};
pub use projector::project;
pub use retention::{RetentionPolicy, RetentionTrimmer};
pub use schema::{reconcile, ColumnAddition, Reconciliation};
