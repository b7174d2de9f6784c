//! Circuit breaker with dual-endpoint failover.
//!
//! The breaker is a plain state machine; callers pass in the current
//! [`Instant`] so transitions are deterministic under test. The actuation
//! client wraps it in a mutex and never holds that lock across a request.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Consecutive failures after which the active endpoint is swapped.
pub const FAILOVER_AFTER: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected without a network attempt.
    Open,
    /// A single probe request is allowed through.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub retry_interval: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            retry_interval: Duration::from_secs(30),
        }
    }
}

/// Returned by [`CircuitBreaker::try_acquire`] when no attempt may be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected;

/// A point-in-time view used by status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failures: u32,
    pub active_endpoint: String,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
    endpoints: [String; 2],
    active: usize,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig, primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failures: 0,
            last_failure: None,
            probe_in_flight: false,
            endpoints: [primary.into(), fallback.into()],
            active: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn active_endpoint(&self) -> &str {
        &self.endpoints[self.active]
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state,
            failures: self.failures,
            active_endpoint: self.active_endpoint().to_string(),
        }
    }

    /// Asks permission to make one call at `now`.
    ///
    /// In `Open`, the first call after `retry_interval` moves the breaker to
    /// `HalfOpen` and becomes the probe. While the probe is outstanding every
    /// other call is rejected.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Rejected> {
        match self.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = self
                    .last_failure
                    .map(|t| now.saturating_duration_since(t))
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.retry_interval {
                    info!(endpoint = %self.active_endpoint(), "Circuit half-open, probing");
                    self.state = CircuitState::HalfOpen;
                    self.probe_in_flight = true;
                    Ok(())
                } else {
                    Err(Rejected)
                }
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    Err(Rejected)
                } else {
                    self.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Any success closes the circuit and clears the failure count.
    pub fn record_success(&mut self) {
        if self.state != CircuitState::Closed {
            info!(endpoint = %self.active_endpoint(), "Circuit closed, connection restored");
        }
        self.state = CircuitState::Closed;
        self.failures = 0;
        self.probe_in_flight = false;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.failures = self.failures.saturating_add(1);
        self.last_failure = Some(now);
        self.probe_in_flight = false;

        if self.failures == FAILOVER_AFTER {
            self.failover();
        }

        if self.state == CircuitState::HalfOpen || self.failures >= self.config.failure_threshold {
            if self.state != CircuitState::Open {
                warn!(failures = self.failures, "Circuit open");
            }
            self.state = CircuitState::Open;
        }
    }

    /// Swaps to the other endpoint without touching the failure count.
    pub fn failover(&mut self) {
        let from = self.active;
        self.active = 1 - self.active;
        info!(
            from = %self.endpoints[from],
            to = %self.endpoints[self.active],
            "Actuation endpoint failover"
        );
    }
}
