//! Retry executor for running operations with retries.

use crate::config::RetryConfig;
use crate::error::{RetryError, RetryResult};
use smoothchat_core::TransportError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// State of a retry attempt.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Current attempt number (1-indexed).
    pub attempt: u32,
    /// Last error message.
    pub last_error: Option<String>,
    /// Total time spent waiting.
    pub total_wait_time: Duration,
    /// History of attempts.
    pub history: Vec<AttemptInfo>,
}

/// Information about a single attempt.
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    /// Attempt number.
    pub attempt: u32,
    /// Whether it succeeded.
    pub success: bool,
    /// Error message if failed.
    pub error: Option<String>,
    /// Time waited after this attempt.
    pub wait_time: Duration,
}

/// Execute an operation with bounded retries.
///
/// Cancellation is checked before every attempt and interrupts the wait
/// between attempts. An attempt already in flight is not interrupted.
///
/// # Example
///
/// ```ignore
/// use smoothchat_retries::{with_retry, CancellationToken, RetryConfig};
///
/// let token = CancellationToken::new();
/// let stream = with_retry(&RetryConfig::default(), &token, || async {
///     connection.stream_chat("agent", &messages).await
/// }).await?;
/// ```
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    operation: F,
) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    with_retry_state(config, cancel, operation).await.0
}

/// Execute with retries and get state information.
pub async fn with_retry_state<F, Fut, T>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> (RetryResult<T>, RetryState)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut state = RetryState::default();
    let max_attempts = config.attempt_limit();

    loop {
        if cancel.is_cancelled() {
            debug!(attempts = state.attempt, "Retry cancelled before attempt");
            return (
                Err(RetryError::Cancelled {
                    attempts: state.attempt,
                }),
                state,
            );
        }

        state.attempt += 1;

        debug!(attempt = state.attempt, max_attempts, "Executing retry attempt");

        match operation().await {
            Ok(result) => {
                state.history.push(AttemptInfo {
                    attempt: state.attempt,
                    success: true,
                    error: None,
                    wait_time: Duration::ZERO,
                });
                return (Ok(result), state);
            }
            Err(error) => {
                state.last_error = Some(error.to_string());

                if !config.retry_on.should_retry(&error) {
                    warn!(attempt = state.attempt, error = %error, "Error not retryable");
                    state.history.push(failed(state.attempt, &error, Duration::ZERO));
                    let attempts = state.attempt;
                    return (Err(RetryError::NotRetryable { error, attempts }), state);
                }

                if state.attempt >= max_attempts {
                    warn!(attempt = state.attempt, error = %error, "Retries exhausted");
                    state.history.push(failed(state.attempt, &error, Duration::ZERO));
                    let attempts = state.attempt;
                    return (Err(RetryError::Exhausted { error, attempts }), state);
                }

                let wait = config.wait.calculate(state.attempt);
                state.total_wait_time += wait;
                state.history.push(failed(state.attempt, &error, wait));

                debug!(
                    attempt = state.attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %error,
                    "Waiting before retry"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(attempts = state.attempt, "Retry cancelled while waiting");
                        let attempts = state.attempt;
                        return (Err(RetryError::Cancelled { attempts }), state);
                    }
                    _ = sleep(wait) => {}
                }
            }
        }
    }
}

fn failed(attempt: u32, error: &TransportError, wait_time: Duration) -> AttemptInfo {
    AttemptInfo {
        attempt,
        success: false,
        error: Some(error.to_string()),
        wait_time,
    }
}
