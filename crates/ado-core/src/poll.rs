//! Bounded "poll until terminal or timeout" primitive.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VcsError};

/// Timing of a bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_secs(timeout: f64, interval: f64) -> Self {
        Self {
            timeout: Duration::from_secs_f64(timeout.max(0.0)),
            interval: Duration::from_secs_f64(interval.max(0.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe reached a terminal state.
    Ready(T),
    /// The timeout expired first.
    TimedOut { attempts: usize },
}

impl<T> PollOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::TimedOut { .. } => None,
        }
    }

    /// The ready value, or `VcsError::Timeout` naming what was awaited.
    pub fn or_timeout(self, operation: &str, target: &str) -> Result<T> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::TimedOut { .. } => Err(VcsError::Timeout {
                operation: operation.to_string(),
                target: target.to_string(),
            }),
        }
    }
}

/// Call `probe` until it returns `Some`, sleeping `interval` between calls.
///
/// The probe runs at least once. No further probe is made once the next
/// one would start after the deadline. Probe errors end the poll.
pub fn poll_until<T, F>(policy: &PollPolicy, mut probe: F) -> Result<PollOutcome<T>>
where
    F: FnMut() -> Result<Option<T>>,
{
    let deadline = Instant::now() + policy.timeout;
    let mut attempts = 0;

    loop {
        attempts += 1;
        if let Some(value) = probe()? {
            return Ok(PollOutcome::Ready(value));
        }
        if Instant::now() + policy.interval > deadline {
            return Ok(PollOutcome::TimedOut { attempts });
        }
        std::thread::sleep(policy.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> PollPolicy {
        PollPolicy::new(Duration::from_secs(5), Duration::from_millis(1))
    }

    #[test]
    fn returns_on_first_terminal_probe() {
        let mut calls = 0;
        let outcome = poll_until(&quick(), || {
            calls += 1;
            Ok((calls == 3).then_some(calls))
        })
        .unwrap();
        assert_eq!(outcome, PollOutcome::Ready(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn zero_timeout_probes_once() {
        let policy = PollPolicy::new(Duration::ZERO, Duration::from_millis(10));
        let outcome: PollOutcome<()> = poll_until(&policy, || Ok(None)).unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 1 });
    }

    #[test]
    fn strict_outcome_reports_timeout() {
        let timed_out: PollOutcome<()> = PollOutcome::TimedOut { attempts: 2 };
        let err = timed_out.or_timeout("merge status", "pull request 7").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Timed out waiting for merge status on pull request 7"
        );
        assert_eq!(PollOutcome::Ready(4).or_timeout("x", "y").unwrap(), 4);
    }

    #[test]
    fn probe_error_stops_polling() {
        let mut calls = 0;
        let result: Result<PollOutcome<()>> = poll_until(&quick(), || {
            calls += 1;
            Err(VcsError::not_found("pull request 7"))
        });
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls, 1);
    }

    #[test]
    fn from_secs_clamps_negative_values() {
        let policy = PollPolicy::from_secs(-1.0, 0.5);
        assert_eq!(policy.timeout, Duration::ZERO);
        assert_eq!(policy.interval, Duration::from_millis(500));
    }
}
