//! Readiness polling service
//!
//! Bounded repeated checks for conditions that become true asynchronously:
//! a host accepting connections, a control plane answering, a workload
//! rolling out. Every sleep goes through the `Clock` port.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::Clock;
use crate::error::{ShipwrightError, ShipwrightResult};

/// What to wait for and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessProbe {
    /// Human-readable subject, used in messages
    pub what: String,
    pub interval: Duration,
    pub max_wait: Duration,
}

impl ReadinessProbe {
    pub fn new(what: impl Into<String>, interval: Duration, max_wait: Duration) -> Self {
        Self {
            what: what.into(),
            interval,
            max_wait,
        }
    }
}

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready {
        attempts: u32,
        waited: Duration,
    },
    TimedOut {
        attempts: u32,
        waited: Duration,
        last_error: Option<String>,
    },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Readiness::Ready { attempts, .. } | Readiness::TimedOut { attempts, .. } => *attempts,
        }
    }

    pub fn waited(&self) -> Duration {
        match self {
            Readiness::Ready { waited, .. } | Readiness::TimedOut { waited, .. } => *waited,
        }
    }

    /// Turn a timeout into `DependencyUnready` for call sites that gate on it
    pub fn into_result(self, what: &str) -> ShipwrightResult<()> {
        match self {
            Readiness::Ready { .. } => Ok(()),
            Readiness::TimedOut {
                waited, last_error, ..
            } => Err(ShipwrightError::DependencyUnready {
                what: what.to_string(),
                waited,
                last_error,
            }),
        }
    }
}

/// Generic bounded poller.
#[derive(Clone)]
pub struct ReadinessPoller {
    clock: Arc<dyn Clock>,
}

impl ReadinessPoller {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Check `predicate` until it returns `Ok(true)` or `probe.max_wait` elapses.
    ///
    /// The first check happens immediately. `Err` from the predicate counts as
    /// "not yet ready" and is remembered as the last error. Sleeps are clamped
    /// to the remaining budget, so the call never overruns `max_wait` by more
    /// than one check.
    pub fn poll<F>(&self, probe: &ReadinessProbe, mut predicate: F) -> Readiness
    where
        F: FnMut() -> ShipwrightResult<bool>,
    {
        let start = self.clock.now();
        let interval = probe.interval.max(Duration::from_millis(1));
        let mut attempts = 0u32;
        let mut last_error = None;

        loop {
            attempts += 1;
            match predicate() {
                Ok(true) => {
                    let waited = self.clock.now().saturating_duration_since(start);
                    tracing::debug!(what = %probe.what, attempts, ?waited, "ready");
                    return Readiness::Ready { attempts, waited };
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(what = %probe.what, attempts, error = %err, "probe error");
                    last_error = Some(err.to_string());
                }
            }

            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= probe.max_wait {
                tracing::debug!(what = %probe.what, attempts, ?elapsed, "timed out");
                return Readiness::TimedOut {
                    attempts,
                    waited: elapsed,
                    last_error,
                };
            }
            self.clock.sleep(interval.min(probe.max_wait - elapsed));
        }
    }
}
