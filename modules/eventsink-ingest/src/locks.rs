use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per table name. Holding a table's guard makes the
/// reconcile → project → append → trim sequence exclusive for that table
/// while other tables keep moving.
#[derive(Debug, Default)]
pub struct TableLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, table: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut registry = self.inner.lock().await;
            registry.entry(table.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of tables that have ever been locked.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_table_is_exclusive() {
        let locks = Arc::new(TableLocks::new());
        let guard = locks.acquire("videos").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire("videos").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_tables_do_not_block() {
        let locks = TableLocks::new();
        let _videos = locks.acquire("videos").await;
        let likes = tokio::time::timeout(Duration::from_millis(100), locks.acquire("likes")).await;
        assert!(likes.is_ok());
        assert_eq!(locks.len().await, 2);
    }
}
