use std::future::Future;
use std::time::Duration;

use eventsink_store::StoreError;

/// Run a store call under a timeout. Elapsed becomes `StoreError::Timeout`.
pub(crate) async fn bounded<T, F>(op: &'static str, after: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { op, after }),
    }
}
