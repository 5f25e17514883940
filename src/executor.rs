//! The retry loop shared by every endpoint.
//!
//! One contract for the whole client: an attempt closure performs exactly
//! one network round trip and reports what it cost on the wire. The loop
//! spends attempts only on retryable failures and keeps the bandwidth
//! total across all of them, failed attempts included.

use std::future::Future;

use tracing::{debug, error, warn};

use crate::bandwidth::BandwidthUsage;
use crate::error::ClientError;

/// Result of a single attempt, or of the whole operation: the typed
/// outcome plus accumulated wire cost.
pub type Outcome<T> = (Result<T, ClientError>, BandwidthUsage);

/// Run `attempt` up to `max_attempts` times.
///
/// Fatal errors (see [`ClientError::is_retryable`]) propagate immediately
/// without consuming the remaining attempts. When the ceiling is hit the
/// last failure is wrapped in [`ClientError::RetriesExhausted`] naming
/// the operation and the attempt count. Bandwidth is summed over every
/// attempt and returned alongside both success and failure.
pub async fn execute<T, F, Fut>(operation: &str, max_attempts: u32, mut attempt: F) -> Outcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Outcome<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut usage = BandwidthUsage::default();
    let mut attempts = 0;
    loop {
        attempts += 1;
        let (result, cost) = attempt().await;
        usage.absorb(cost);
        match result {
            Ok(value) => {
                debug!(operation, attempt = attempts, "request succeeded");
                return (Ok(value), usage);
            }
            Err(err) if !err.is_retryable() => {
                return (Err(err), usage);
            }
            Err(err) => {
                if attempts < max_attempts {
                    warn!(
                        operation,
                        attempt = attempts,
                        max_attempts,
                        error = %err,
                        "attempt failed, retrying"
                    );
                } else {
                    error!(
                        operation,
                        attempts,
                        error = %err,
                        "giving up after repeated failures"
                    );
                    return (
                        Err(ClientError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts,
                            source: Box::new(err),
                        }),
                        usage,
                    );
                }
            }
        }
    }
}
