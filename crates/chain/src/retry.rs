use std::future::Future;
use std::time::Duration;

use explorer_core::AppError;
use tokio_util::sync::CancellationToken;

/// Fixed-delay retry policy for chain-node calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Pause between attempts. No jitter.
    pub delay: Duration,
    /// Decides whether a failed attempt may be repeated.
    pub retry_if: fn(&AppError) -> bool,
}

impl RetryPolicy {
    pub const fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            retry_if: AppError::is_transient,
        }
    }

    /// Retry on every error, including ones classified as terminal.
    pub fn retry_everything(self) -> Self {
        Self {
            retry_if: |e| !e.is_cancelled(),
            ..self
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_secs(2))
    }
}

/// Run `f` until it succeeds, the policy gives up, or `cancel` fires.
///
/// Both the call itself and the pause between attempts race against the
/// cancellation token, so a cancelled caller never waits for a useless final
/// attempt.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    mut f: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        attempt += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            result = f() => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !(policy.retry_if)(&err) {
            return Err(err);
        }
        if attempt >= attempts {
            return Err(AppError::RetriesExhausted {
                operation: operation.to_string(),
                attempts: attempt,
                source: Box::new(err),
            });
        }

        tracing::info!(operation, attempt, error = %err, "retrying after error");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}
