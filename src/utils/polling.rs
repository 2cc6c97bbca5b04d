//! Fixed-interval polling for slow external state
//!
//! Everything this tool waits on (systemd units, the API server, pod
//! readiness) is polled the same way: probe, sleep a fixed interval,
//! probe again, up to a hard attempt cap. Exhausting the cap is fatal.

use anyhow::{Result, bail};
use std::thread;
use std::time::Duration;

/// A capped sleep-and-recheck loop
pub struct PollConfig {
    description: String,
    interval: Duration,
    max_attempts: u32,
}

impl PollConfig {
    pub fn new(description: impl Into<String>, interval: Duration, max_attempts: u32) -> Self {
        Self {
            description: description.into(),
            interval,
            max_attempts,
        }
    }

    /// The standard cadence for service/API readiness: 5s apart
    pub fn every_five_secs(description: impl Into<String>, max_attempts: u32) -> Self {
        Self::new(description, Duration::from_secs(5), max_attempts)
    }

    /// Total time budget if every attempt is spent
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }

    /// Run `probe` until it returns true or the cap is exhausted.
    /// Returns the attempt number that succeeded.
    pub fn wait_until<F>(&self, mut probe: F) -> Result<u32>
    where
        F: FnMut() -> bool,
    {
        for attempt in 1..=self.max_attempts {
            if probe() {
                return Ok(attempt);
            }
            if attempt < self.max_attempts {
                thread::sleep(self.interval);
            }
        }
        bail!(
            "Timed out waiting for {} ({} attempts, {}s apart)",
            self.description,
            self.max_attempts,
            self.interval.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeds_first_attempt() {
        let poll = PollConfig::new("immediate", Duration::from_millis(1), 3);
        let attempt = poll.wait_until(|| true).unwrap();
        assert_eq!(attempt, 1);
    }

    #[test]
    fn test_succeeds_after_retries() {
        let mut calls = 0;
        let poll = PollConfig::new("third time", Duration::from_millis(1), 5);
        let attempt = poll
            .wait_until(|| {
                calls += 1;
                calls >= 3
            })
            .unwrap();
        assert_eq!(attempt, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_cap_exhaustion_is_fatal() {
        let mut calls = 0;
        let poll = PollConfig::new("never ready", Duration::from_millis(1), 4);
        let err = poll
            .wait_until(|| {
                calls += 1;
                false
            })
            .unwrap_err();
        assert_eq!(calls, 4);
        assert!(err.to_string().contains("never ready"));
        assert!(err.to_string().contains("4 attempts"));
    }

    #[test]
    fn test_budget() {
        let poll = PollConfig::every_five_secs("x", 60);
        assert_eq!(poll.budget(), Duration::from_secs(300));
    }
}
