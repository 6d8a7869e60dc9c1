//! Retry with exponential backoff for idempotent reads.
//!
//! Only `fetch_report` routes through here: re-sending a read is always
//! safe. Content commits (section/report updates, submit) are NEVER
//! retried automatically, because a re-sent stale patch could overwrite newer
//! edits the user made while the first attempt was in flight; failed
//! commits surface through the save status instead and are re-sent by
//! an explicit manual save.

use std::time::Duration;

/// Maximum number of retry attempts after the initial request.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

/// Send an idempotent request with exponential backoff on transport
/// errors.
///
/// The closure `f` is called up to `MAX_RETRIES + 1` times. Only
/// [`reqwest::Error`] transport failures trigger a retry; non-2xx
/// responses are returned to the caller for status-based handling.
pub(crate) async fn retry_read<F, Fut>(f: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "report fetch failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    // Final attempt, no more retries.
    f().await
}
