//! Utility functions shared by the relay crates.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Truncate a string to at most `max_chars` characters, respecting char boundaries.
///
/// # Examples
///
/// ```
/// use media_relay_core::utils::truncate_str;
/// let s = "Привіт, світ!";
/// assert_eq!(truncate_str(s, 6), "Привіт");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Format a byte count as megabytes with two decimals.
///
/// # Examples
///
/// ```
/// use media_relay_core::utils::format_megabytes;
/// assert_eq!(format_megabytes(10 * 1024 * 1024), "10.00");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Used for the status-message calls (send, edit, delete) that may fail on
/// transient network errors.
///
/// The retry strategy uses exponential backoff with jitter:
/// - Initial delay: 500ms
/// - Max delay: 4s
/// - Max attempts: 3 (see constants in `config.rs`)
///
/// # Examples
///
/// ```no_run
/// use media_relay_core::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn delete_status() -> Result<()> {
///     Ok(())
/// }
///
/// # async fn example() -> Result<()> {
/// retry_telegram_operation(|| async { delete_status().await }).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the last error if every attempt fails.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TELEGRAM_API_MAX_RETRIES;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привіт, світ!";
        assert_eq!(truncate_str(s, 6), "Привіт");
        assert_eq!(truncate_str(s, 100), s);
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(0), "0.00");
        assert_eq!(format_megabytes(1024 * 1024 + 512 * 1024), "1.50");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = retry_telegram_operation(|| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("connection reset");
                }
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<()> = retry_telegram_operation(|| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("still down")
            }
        })
        .await;

        assert!(result.is_err());
        // First attempt plus one retry per strategy step
        assert_eq!(calls.load(Ordering::SeqCst), 1 + TELEGRAM_API_MAX_RETRIES);
    }
}
