//! Circuit breaker around the ledger store
//!
//! CLOSED counts call outcomes in a rolling time window and opens once
//! the failure rate crosses the threshold at or above a minimum call
//! count. OPEN short-circuits every call until the cooldown elapses,
//! then HALF_OPEN admits a bounded number of probes: enough successes
//! close the breaker, any transient failure reopens it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Closed (normal operation)
    Closed,
    /// Open (rejecting requests)
    Open,
    /// Half-open (testing)
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure rate in [0, 1] that opens the breaker
    pub failure_rate_threshold: f64,
    /// Minimum calls in the window before the rate is evaluated
    pub min_calls: u32,
    /// Rolling window length (milliseconds)
    pub window_ms: u64,
    /// Time spent open before half-opening (milliseconds)
    pub cooldown_ms: u64,
    /// Probe calls admitted while half-open
    pub half_open_max_probes: u32,
    /// Successes in half-open that close the breaker
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            min_calls: 10,
            window_ms: 60_000,
            cooldown_ms: 30_000,
            half_open_max_probes: 3,
            success_threshold: 2,
        }
    }
}

/// Circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    /// Outcomes in the rolling window (true = success)
    outcomes: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    probes_issued: u32,
    probe_successes: u32,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create new circuit breaker
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: CircuitState::Closed,
            outcomes: VecDeque::new(),
            opened_at: None,
            probes_issued: 0,
            probe_successes: 0,
            config,
        }
    }

    /// Check whether a call may pass through
    ///
    /// Returns `Unavailable` while the breaker is rejecting load.
    pub fn check(&mut self, operation: &str) -> Result<()> {
        match self.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                let cooldown = Duration::from_millis(self.config.cooldown_ms);

                if elapsed >= cooldown {
                    info!("circuit breaker half-opening for {}", operation);
                    self.state = CircuitState::HalfOpen;
                    self.probes_issued = 1;
                    self.probe_successes = 0;
                    Ok(())
                } else {
                    Err(Error::Unavailable(format!(
                        "circuit open, retry in {}ms",
                        (cooldown - elapsed).as_millis()
                    )))
                }
            }
            CircuitState::HalfOpen => {
                if self.probes_issued < self.config.half_open_max_probes {
                    self.probes_issued += 1;
                    Ok(())
                } else {
                    Err(Error::Unavailable(
                        "circuit half-open, probe budget exhausted".to_string(),
                    ))
                }
            }
        }
    }

    /// Record a successful call
    pub fn record_success(&mut self, operation: &str) {
        match self.state {
            CircuitState::Closed => {
                self.push_outcome(true);
            }
            CircuitState::HalfOpen => {
                self.probe_successes += 1;
                if self.probe_successes >= self.config.success_threshold {
                    info!("circuit breaker closing for {}", operation);
                    self.state = CircuitState::Closed;
                    self.outcomes.clear();
                    self.opened_at = None;
                    self.probes_issued = 0;
                    self.probe_successes = 0;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call
    pub fn record_failure(&mut self, operation: &str) {
        match self.state {
            CircuitState::Closed => {
                self.push_outcome(false);
                let total = self.outcomes.len() as u32;
                if total >= self.config.min_calls
                    && self.failure_rate() >= self.config.failure_rate_threshold
                {
                    warn!(
                        "circuit breaker opening for {} at {:.0}% failure rate over {} calls",
                        operation,
                        self.failure_rate() * 100.0,
                        total
                    );
                    self.state = CircuitState::Open;
                    self.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                warn!("circuit breaker re-opening for {}", operation);
                self.state = CircuitState::Open;
                self.opened_at = Some(Instant::now());
                self.probes_issued = 0;
                self.probe_successes = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Reset circuit breaker (manual intervention)
    pub fn reset(&mut self, operation: &str) {
        info!("manually resetting circuit breaker for {}", operation);
        self.state = CircuitState::Closed;
        self.outcomes.clear();
        self.opened_at = None;
        self.probes_issued = 0;
        self.probe_successes = 0;
    }

    fn push_outcome(&mut self, success: bool) {
        self.outcomes.push_back((Instant::now(), success));
        self.prune_window();
    }

    fn prune_window(&mut self) {
        let window = Duration::from_millis(self.config.window_ms);
        let now = Instant::now();
        while let Some((at, _)) = self.outcomes.front() {
            if now.duration_since(*at) > window {
                self.outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let failures = self.outcomes.iter().filter(|(_, ok)| !ok).count();
        failures as f64 / self.outcomes.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn test_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_rate_threshold: 0.5,
            min_calls: 3,
            window_ms: 60_000,
            cooldown_ms: 50,
            half_open_max_probes: 2,
            success_threshold: 2,
        }
    }

    #[test]
    fn test_stays_closed_below_min_calls() {
        let mut cb = CircuitBreaker::new(test_config());

        cb.record_failure("test");
        cb.record_failure("test");
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.check("test").is_ok());
    }

    #[test]
    fn test_opens_on_failure_rate() {
        let mut cb = CircuitBreaker::new(test_config());

        cb.record_failure("test");
        cb.record_failure("test");
        cb.record_failure("test");
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.check("test").is_err());
    }

    #[test]
    fn test_successes_dilute_failure_rate() {
        let mut cb = CircuitBreaker::new(test_config());

        cb.record_success("test");
        cb.record_success("test");
        cb.record_success("test");
        cb.record_failure("test");
        cb.record_failure("test");
        // 2 failures out of 5: 40% < 50%
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_after_cooldown_then_close() {
        let mut cb = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            cb.record_failure("test");
        }
        assert_eq!(cb.state(), CircuitState::Open);

        sleep(Duration::from_millis(60));

        assert!(cb.check("test").is_ok());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success("test");

        assert!(cb.check("test").is_ok());
        cb.record_success("test");
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let mut cb = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            cb.record_failure("test");
        }
        sleep(Duration::from_millis(60));

        assert!(cb.check("test").is_ok());
        cb.record_failure("test");
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.check("test").is_err());
    }

    #[test]
    fn test_half_open_probe_budget() {
        let mut cb = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            cb.record_failure("test");
        }
        sleep(Duration::from_millis(60));

        // Budget of 2 probes, no outcome recorded yet
        assert!(cb.check("test").is_ok());
        assert!(cb.check("test").is_ok());
        assert!(cb.check("test").is_err());
    }

    #[test]
    fn test_reset() {
        let mut cb = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            cb.record_failure("test");
        }
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset("test");
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.check("test").is_ok());
    }
}
