//! Bounded fixed-interval retry and state polling
//!
//! The provider is eventually consistent: a delete can fail while a
//! dependent resource is still settling, and an instance takes a while to
//! reach a running state. Both cases are handled with a bounded loop and a
//! fixed pause. The consistency window is small, so no backoff schedule is
//! needed.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Attempt bound for operations that settle quickly (e.g. a security group
/// delete blocked by a just-terminated instance).
pub const FAST_ATTEMPTS: u32 = 20;
pub const FAST_PAUSE: Duration = Duration::from_secs(1);

/// Attempt bound for slow operations (e.g. internet gateway detachment).
pub const SLOW_ATTEMPTS: u32 = 20;
pub const SLOW_PAUSE: Duration = Duration::from_secs(5);

/// Pause between probes when waiting on a state transition.
pub const POLL_PAUSE: Duration = Duration::from_secs(1);

/// Window for waiting on an instance to reach a running state.
pub const RUNNING_WAIT_WINDOW: Duration = Duration::from_secs(60);

/// Re-run `op` until it succeeds, pausing `pause` between attempts.
///
/// After `attempts` failures the last error is propagated as fatal.
pub async fn retry_fixed<T, F, Fut>(attempts: u32, pause: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if attempt >= attempts {
                    return Err(error);
                }
                debug!(attempt, %error, "operation failed, retrying after pause");
                sleep(pause).await;
            }
        }
    }
}

/// Poll `probe` until it yields a value or `window` elapses.
///
/// Returns `Ok(None)` on expiry so the call site decides whether the wait
/// was best-effort or critical. Probe errors propagate immediately.
pub async fn poll_until<T, F, Fut>(window: Duration, pause: Duration, mut probe: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = tokio::time::Instant::now();
    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }
        if started.elapsed() >= window {
            return Ok(None);
        }
        sleep(pause).await;
    }
}

/// Poll `probe` until it yields a value, with no deadline.
///
/// Only for transitions the provider guarantees will happen, such as a
/// requested public address being assigned.
pub async fn poll_forever<T, F, Fut>(pause: Duration, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn retry_returns_first_success() {
        let calls = Cell::new(0u32);
        let result = retry_fixed(FAST_ATTEMPTS, FAST_PAUSE, || {
            calls.set(calls.get() + 1);
            async move {
                if calls.get() < 3 {
                    Err(CloudError::Api("still settling".into()))
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, "done");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_propagates_last_error() {
        let calls = Cell::new(0u32);
        let error = retry_fixed(FAST_ATTEMPTS, FAST_PAUSE, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Err::<(), _>(CloudError::Api(format!("failure {n}"))) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), FAST_ATTEMPTS);
        assert!(error.to_string().contains("failure 20"));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_gives_up_after_window() {
        let calls = Cell::new(0u32);
        let outcome: Option<()> = poll_until(RUNNING_WAIT_WINDOW, POLL_PAUSE, || {
            calls.set(calls.get() + 1);
            async { Ok(None) }
        })
        .await
        .unwrap();
        assert!(outcome.is_none());
        // one probe per second across the window, plus the initial probe
        assert!(calls.get() >= 60);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_forever_waits_out_the_transition() {
        let calls = Cell::new(0u32);
        let value = poll_forever(POLL_PAUSE, || {
            calls.set(calls.get() + 1);
            async move {
                if calls.get() < 5 {
                    Ok(None)
                } else {
                    Ok(Some("198.51.100.7".to_string()))
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, "198.51.100.7");
        assert_eq!(calls.get(), 5);
    }
}
