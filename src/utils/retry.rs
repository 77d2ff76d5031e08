use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Exponential Backoff Retry Strategy
// ============================================================================
//
// Opt-in, caller-side retry for transient event log failures. The store
// never retries on its own: replaying a read (reconstruct) is always safe,
// re-submitting a write is a decision only the caller can make.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn next_delay(&self, delay: Duration) -> Duration {
        let next = Duration::from_millis((delay.as_millis() as f64 * self.multiplier) as u64);
        next.min(self.max_delay)
    }
}

/// Result of a retry operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded
    Success(T),
    /// Operation failed after all retries
    Failed(E),
    /// Operation failed with an error that retrying cannot fix
    PermanentFailure(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed(err) | RetryResult::PermanentFailure(err) => Err(err),
        }
    }
}

/// Check if an error is transient (should retry) or permanent (should not retry)
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Execute an operation with exponential backoff, stopping on permanent errors
pub async fn retry_on_transient<F, Fut, T, E>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(operation = operation_name, attempt, "Operation succeeded after retry");
                }
                return RetryResult::Success(result);
            }
            Err(error) => {
                if !error.is_transient() {
                    tracing::error!(
                        operation = operation_name,
                        error = %error,
                        "Permanent failure detected, not retrying"
                    );
                    return RetryResult::PermanentFailure(error);
                }

                if attempt >= config.max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %error,
                        "Operation failed after all retries"
                    );
                    return RetryResult::Failed(error);
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying after delay"
                );

                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}
