use crate::host::Scheduler;
use screening_common::{AgentError, ElementId};
use std::time::Duration;
use tracing::debug;

/// Default spacing between resolution attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Floor for the spacing, so a zero interval cannot spin until the deadline.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One in-flight wait: created per call, dropped on success or timeout.
#[derive(Debug, Clone)]
pub struct PendingWait {
    pub selector: String,
    pub deadline: Duration,
    pub poll_interval: Duration,
}

impl PendingWait {
    pub fn new(selector: &str, now: Duration, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            selector: selector.to_string(),
            deadline: now + timeout,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// How long to sleep before the next attempt, or `None` once the deadline has passed.
    ///
    /// The last sleep is shortened so the final attempt lands on the deadline.
    pub fn next_delay(&self, now: Duration) -> Option<Duration> {
        if now >= self.deadline {
            return None;
        }
        Some(self.poll_interval.min(self.deadline - now))
    }
}

/// Poll `attempt` until it yields an id or `timeout` elapses.
///
/// Only a "no match" result is retried. Any other failure, such as a
/// selector the platform rejects, ends the wait immediately.
pub async fn wait_for_element<F>(
    scheduler: &dyn Scheduler,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut attempt: F,
) -> Result<ElementId, AgentError>
where
    F: FnMut() -> Result<Vec<ElementId>, AgentError>,
{
    let pending = PendingWait::new(selector, scheduler.now(), timeout, poll_interval);
    loop {
        match attempt() {
            Ok(ids) => {
                if let Some(id) = ids.first() {
                    return Ok(*id);
                }
            }
            Err(e) if e.is_no_match() => {}
            Err(e) => return Err(e),
        }

        let Some(delay) = pending.next_delay(scheduler.now()) else {
            debug!(selector, "wait deadline reached");
            return Err(AgentError::Timeout {
                selector: pending.selector,
                timeout_ms: timeout.as_millis() as u64,
            });
        };
        scheduler.sleep(delay).await;
    }
}
