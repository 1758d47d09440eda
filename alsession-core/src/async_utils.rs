//! Async helpers

use crate::error::{ErrorContext, SessionError, SessionResult};
use tokio::time::{timeout, Duration};
use tracing::warn;

/// Run a fallible future under an optional deadline. `None` means no limit.
pub async fn with_timeout<F, T>(
    future: F,
    timeout_ms: Option<u64>,
    operation_name: &str,
) -> SessionResult<T>
where
    F: std::future::Future<Output = SessionResult<T>>,
{
    let Some(timeout_ms) = timeout_ms else {
        return future.await;
    };

    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation = operation_name,
                timeout_ms, "Operation timed out"
            );
            Err(SessionError::Timeout {
                operation: operation_name.to_string(),
                duration_ms: timeout_ms,
                context: ErrorContext::new("async_utils")
                    .with_operation("timeout")
                    .with_metadata("timeout_ms", &timeout_ms.to_string())
                    .with_suggestion("Increase resolution_timeout_ms")
                    .with_suggestion("Verify backend service availability"),
            })
        }
    }
}
