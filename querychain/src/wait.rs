//! Bounded condition waiting
//!
//! A condition is polled on a blocking worker while the calling thread waits on
//! a timer. Whatever stops the wait early, a timeout or the condition itself
//! failing, comes back as a single `ConditionTimeout` carrying the caller's
//! message and the underlying cause.

use crate::dispatch::{blocking_section, panic_message};
use crate::errors::AutomationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, warn};

/// Default polling interval between condition checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Options for a single wait
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Diagnostic message carried by the failure
    pub message: Option<String>,
}

impl WaitOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            message: None,
        }
    }

    pub fn from_secs(timeout_secs: u64) -> Self {
        Self::new(Duration::from_secs(timeout_secs))
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Poll `condition` until it returns `Ok(true)` or `options.timeout` elapses.
///
/// An `Err` from the condition ends the wait at once, without further polling.
/// The calling thread blocks for the duration, also when it is an async worker.
pub fn wait_for<F>(options: &WaitOptions, condition: F) -> Result<(), AutomationError>
where
    F: FnMut() -> Result<bool, AutomationError> + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let poller_cancelled = cancelled.clone();
    let poll_interval = options.poll_interval;
    let timeout = options.timeout;

    debug!("Waiting up to {timeout:?} for condition");
    let outcome = blocking_section(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| {
                AutomationError::Internal(format!("Failed to build wait runtime: {e}"))
            })?;
        let outcome = runtime.block_on(async move {
            let poller = task::spawn_blocking(move || {
                poll_until(condition, poll_interval, &poller_cancelled)
            });
            tokio::time::timeout(timeout, poller).await
        });
        // Does not join the poller; a stuck condition exits at its next cancel check.
        runtime.shutdown_background();
        Ok::<_, AutomationError>(outcome)
    })??;

    let cause = match outcome {
        Ok(Ok(Ok(()))) => return Ok(()),
        Ok(Ok(Err(raised))) => raised,
        Ok(Err(join_error)) if join_error.is_panic() => AutomationError::Internal(format!(
            "Condition panicked: {}",
            panic_message(join_error.into_panic().as_ref())
        )),
        Ok(Err(join_error)) => {
            AutomationError::Internal(format!("Condition task failed: {join_error}"))
        }
        Err(_) => {
            cancelled.store(true, Ordering::Relaxed);
            AutomationError::Timeout(format!("Condition not satisfied within {timeout:?}"))
        }
    };

    warn!(
        message = options.message.as_deref().unwrap_or_default(),
        "Wait failed: {cause}"
    );
    Err(AutomationError::ConditionTimeout {
        message: options.message.clone(),
        cause: Box::new(cause),
    })
}

fn poll_until<F>(
    mut condition: F,
    poll_interval: Duration,
    cancelled: &AtomicBool,
) -> Result<(), AutomationError>
where
    F: FnMut() -> Result<bool, AutomationError>,
{
    loop {
        if condition()? {
            return Ok(());
        }
        if cancelled.load(Ordering::Relaxed) {
            return Err(AutomationError::Timeout("wait cancelled".to_string()));
        }
        std::thread::sleep(poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_returns_once_condition_holds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = wait_for(&WaitOptions::from_secs(2), move || {
            Ok(counter.fetch_add(1, Ordering::SeqCst) >= 3)
        });

        assert!(result.is_ok(), "{result:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_timeout_wraps_timeout_cause_and_message() {
        let options = WaitOptions::new(Duration::from_millis(200)).with_message("never");
        let start = Instant::now();

        let err = wait_for(&options, || Ok(false)).unwrap_err();

        assert!(start.elapsed() >= Duration::from_millis(200));
        match err {
            AutomationError::ConditionTimeout { message, cause } => {
                assert_eq!(message.as_deref(), Some("never"));
                assert!(matches!(*cause, AutomationError::Timeout(_)), "{cause:?}");
            }
            other => panic!("Expected ConditionTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_raising_condition_stops_polling_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let start = Instant::now();

        let err = wait_for(&WaitOptions::from_secs(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AutomationError::PlatformError("lost connection".to_string()))
        })
        .unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.to_string().contains("Condition was not satisfied"));
        match err.condition_cause() {
            Some(AutomationError::PlatformError(msg)) => assert_eq!(msg, "lost connection"),
            other => panic!("Expected PlatformError cause, got {other:?}"),
        }
    }

    #[test]
    fn test_panicking_condition_is_reported_as_cause() {
        let err = wait_for(&WaitOptions::from_secs(5), || -> Result<bool, AutomationError> {
            panic!("kaboom")
        })
        .unwrap_err();

        match err.condition_cause() {
            Some(AutomationError::Internal(msg)) => assert!(msg.contains("kaboom"), "{msg}"),
            other => panic!("Expected Internal cause, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_from_a_runtime_worker() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        wait_for(&WaitOptions::from_secs(2), move || {
            Ok(counter.fetch_add(1, Ordering::SeqCst) >= 2)
        })
        .unwrap();

        let err = wait_for(&WaitOptions::new(Duration::from_millis(100)), || Ok(false)).unwrap_err();
        assert!(matches!(err.condition_cause(), Some(AutomationError::Timeout(_))), "{err:?}");
    }
}
