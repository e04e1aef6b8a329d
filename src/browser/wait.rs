use crate::browser::{Browser, BrowserResult};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Polls until an element matching `selector` exists or `timeout` elapses
///
/// Returns `Ok(false)` on timeout; the caller decides whether a missing element
/// means "no data" or a failure. Browser errors are propagated immediately.
pub async fn wait_for<B: Browser + ?Sized>(
    browser: &B,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> BrowserResult<bool> {
    let deadline = Instant::now() + timeout;

    loop {
        if browser.exists(selector).await? {
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!("Timed out after {:?} waiting for {}", timeout, selector);
            return Ok(false);
        }

        sleep(poll_interval.min(deadline - now)).await;
    }
}
