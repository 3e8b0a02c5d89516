//! Retry logic with exponential backoff
//!
//! Used for calls to the AI backend, where a busy model server or a dropped
//! connection is common and a second attempt usually succeeds.
//!
//! # Example
//!
//! ```no_run
//! use newsnode::retry::{IsRetryable, with_retry};
//! use newsnode::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Busy,
//!     Rejected,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Busy)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, || async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, SourceError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, 5xx answers) return `true`.
/// Permanent failures (bad input, missing records, parse errors) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            Error::Source(SourceError::Http { status, .. }) => *status >= 500 || *status == 429,
            Error::Source(SourceError::Request { .. }) => true,
            Error::Source(_) => false,
            // The backend reports its own failures as an `error` envelope;
            // only overload-style messages are worth another attempt
            Error::Ai(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("timeout")
                    || msg.contains("busy")
                    || msg.contains("overloaded")
                    || msg.contains("503")
                    || msg.contains("502")
            }
            Error::Timeout(_) => true,
            Error::Config { .. }
            | Error::Database(_)
            | Error::Sqlx(_)
            | Error::Store(_)
            | Error::NotReady(_)
            | Error::Job(_)
            | Error::Validation(_)
            | Error::NotFound(_)
            | Error::Duplicate(_)
            | Error::Serialization(_)
            | Error::ApiServerError(_)
            | Error::ShuttingDown
            | Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// `config.max_attempts` counts retries, so the operation runs at most
/// `max_attempts + 1` times. Returns the last error once attempts run out or
/// on the first non-retryable error.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(attempts = attempt + 1, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "operation failed, retrying"
                );

                let wait = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(wait).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(error = %e, attempts = attempt + 1, "retry attempts exhausted");
                }
                return Err(e);
            }
        }
    }
}

// Uniform in [delay, 2 * delay]
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + factor))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_transient_ai_error_is_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry(&fast_config(3), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Ai("model busy".into()))
                } else {
                    Ok("translated")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "translated");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), Error> = with_retry(&fast_config(2), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Timeout("summarize".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), Error> = with_retry(&fast_config(5), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Validation("text must not be empty".into()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jitter_stays_within_double_delay() {
        let base = Duration::from_millis(100);
        for _ in 0..50 {
            let d = add_jitter(base);
            assert!(d >= base && d <= base * 2);
        }
    }

    #[test]
    fn test_source_errors_classified_by_status() {
        let server = Error::Source(SourceError::Http {
            endpoint: "x".into(),
            status: 503,
        });
        let missing = Error::Source(SourceError::Http {
            endpoint: "x".into(),
            status: 404,
        });
        let parse = Error::Source(SourceError::Parse {
            endpoint: "x".into(),
            reason: "eof".into(),
        });
        assert!(server.is_retryable());
        assert!(!missing.is_retryable());
        assert!(!parse.is_retryable());
        assert!(!Error::Ai("unsupported language".into()).is_retryable());
    }
}
