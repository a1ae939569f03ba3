//! Rolling retention. Tables are capped at `cap` rows, but only trimmed once
//! they pass `cap + margin`, so steady-state appends don't trim every time.

use std::time::Duration;

use tracing::{info, warn};

use eventsink_store::{TableRef, TableStore};

use crate::deadline::bounded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub cap: u64,
    pub margin: u64,
}

impl RetentionPolicy {
    pub const fn new(cap: u64, margin: u64) -> Self {
        Self { cap, margin }
    }

    /// How many of the oldest rows to delete for a table holding `total` rows.
    pub fn rows_to_trim(&self, total: u64) -> u64 {
        if total > self.cap.saturating_add(self.margin) {
            total.saturating_sub(self.cap)
        } else {
            0
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(5000, 100)
    }
}

/// Applies a [`RetentionPolicy`] after appends. Best-effort: failures are
/// logged and never surface to the submitter.
#[derive(Debug, Clone)]
pub struct RetentionTrimmer {
    policy: RetentionPolicy,
    timeout: Duration,
}

impl RetentionTrimmer {
    pub fn new(policy: RetentionPolicy, timeout: Duration) -> Self {
        Self { policy, timeout }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Returns the number of rows deleted.
    pub async fn enforce(&self, store: &dyn TableStore, table: &TableRef) -> u64 {
        let total = match bounded("row_count", self.timeout, store.row_count(table)).await {
            Ok(total) => total,
            Err(e) => {
                warn!(table = table.name(), error = %e, "Retention check failed (non-fatal)");
                return 0;
            }
        };

        let excess = self.policy.rows_to_trim(total);
        if excess == 0 {
            return 0;
        }

        match bounded(
            "delete_oldest_rows",
            self.timeout,
            store.delete_oldest_rows(table, excess),
        )
        .await
        {
            Ok(()) => {
                info!(
                    table = table.name(),
                    deleted = excess,
                    remaining = total - excess,
                    "Trimmed table to retention cap"
                );
                excess
            }
            Err(e) => {
                warn!(table = table.name(), error = %e, excess, "Retention trim failed (non-fatal)");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventsink_common::Cell;
    use eventsink_store::MemoryStore;

    #[test]
    fn under_cap_plus_margin_keeps_everything() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.rows_to_trim(0), 0);
        assert_eq!(policy.rows_to_trim(5000), 0);
        assert_eq!(policy.rows_to_trim(5100), 0);
    }

    #[test]
    fn past_margin_trims_down_to_cap() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.rows_to_trim(5101), 101);
        assert_eq!(policy.rows_to_trim(9000), 4000);
    }

    #[test]
    fn zero_margin_trims_every_excess_row() {
        let policy = RetentionPolicy::new(3, 0);
        assert_eq!(policy.rows_to_trim(3), 0);
        assert_eq!(policy.rows_to_trim(4), 1);
    }

    #[test]
    fn huge_settings_do_not_overflow() {
        let policy = RetentionPolicy::new(u64::MAX, u64::MAX);
        assert_eq!(policy.rows_to_trim(u64::MAX), 0);
    }

    #[tokio::test]
    async fn enforce_keeps_newest_rows() {
        let store = MemoryStore::new();
        let table = store.create_table("t", &["n".to_string()]).await.unwrap();
        for n in 0..8i64 {
            store
                .append_row(&table, &vec![Cell::Number(n.into())])
                .await
                .unwrap();
        }

        let trimmer = RetentionTrimmer::new(RetentionPolicy::new(5, 2), Duration::from_secs(1));
        assert_eq!(trimmer.enforce(&store, &table).await, 3);

        let snap = store.snapshot("t").await.unwrap();
        assert_eq!(snap.header, vec!["n".to_string()]);
        assert_eq!(snap.rows.first(), Some(&vec![Cell::Number(3i64.into())]));
        assert_eq!(snap.rows.len(), 5);
    }

    #[tokio::test]
    async fn enforce_on_missing_table_is_swallowed() {
        let store = MemoryStore::new();
        let trimmer = RetentionTrimmer::new(RetentionPolicy::default(), Duration::from_secs(1));
        assert_eq!(trimmer.enforce(&store, &TableRef::new("ghost")).await, 0);
    }
}
