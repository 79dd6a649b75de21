//! Circuit breaker guarding the synchronous delivery path.
//!
//! - Closed: calls go through, consecutive failures are counted.
//! - Open: calls are refused until `open_duration` has passed.
//! - HalfOpen: a single probe call is let through; its result closes or reopens the circuit.
//!   A probe that never reports back (its future was dropped) counts as failed.

use std::time::Duration;

use log::{info, warn};
use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub open_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        BreakerConfig {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed { failures: u32 },
    Open { since: Instant },
    /// A probe call is in flight.
    HalfOpen,
}

pub struct CircuitBreaker {
    config: BreakerConfig,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        CircuitBreaker {
            config: BreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                ..config
            },
            state: Mutex::new(CircuitState::Closed { failures: 0 }),
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.lock()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state(), CircuitState::Open { .. })
    }

    /// Asks for permission to make a call.
    ///
    /// The returned permit reports the call's result. A probe permit dropped
    /// without a result counts as a failed probe.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.state.lock();
        let probe = match *state {
            CircuitState::Closed { .. } => false,
            CircuitState::Open { since } => {
                if since.elapsed() < self.config.open_duration {
                    return None;
                }
                info!("Circuit half-open, probing workload service");
                *state = CircuitState::HalfOpen;
                true
            }
            CircuitState::HalfOpen => return None,
        };
        Some(Permit {
            breaker: self,
            probe,
            settled: false,
        })
    }

    fn record_success(&self) {
        let mut state = self.state.lock();
        if matches!(*state, CircuitState::HalfOpen) {
            info!("Circuit closed, workload service recovered");
        }
        *state = CircuitState::Closed { failures: 0 };
    }

    fn record_failure(&self) {
        let mut state = self.state.lock();
        *state = match *state {
            CircuitState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.config.failure_threshold {
                    warn!("Circuit opened after {} consecutive failures", failures);
                    CircuitState::Open {
                        since: Instant::now(),
                    }
                } else {
                    CircuitState::Closed { failures }
                }
            }
            CircuitState::HalfOpen => {
                warn!("Probe failed, circuit reopened");
                CircuitState::Open {
                    since: Instant::now(),
                }
            }
            open @ CircuitState::Open { .. } => open,
        };
    }
}

/// Permission for one call through the breaker.
#[must_use]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl Permit<'_> {
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.settled || !self.probe {
            return;
        }
        warn!("Probe abandoned before completion");
        self.breaker.record_failure();
    }
}
