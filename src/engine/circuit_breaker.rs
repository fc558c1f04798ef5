// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-pattern circuit breaker.
//!
//! Closed counts consecutive failures inside a rolling monitoring window and
//! trips to Open at the configured threshold. Open short-circuits every call
//! (the processor is never invoked) until the recovery timeout elapses, then
//! admits a single probe in HalfOpen: success closes the circuit, failure
//! reopens it.

use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::CircuitBreakerConfig;
use crate::errors::PatternError;
use crate::observability::messages::step::{CircuitClosed, CircuitOpened};
use crate::observability::messages::StructuredLog;

#[derive(Debug)]
enum BreakerState {
    Closed {
        consecutive_failures: u32,
        window_start: Instant,
    },
    Open {
        opened_at: Instant,
    },
    HalfOpen,
}

pub struct CircuitBreaker {
    pattern_id: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(pattern_id: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            pattern_id: pattern_id.to_string(),
            config,
            state: Mutex::new(BreakerState::Closed {
                consecutive_failures: 0,
                window_start: Instant::now(),
            }),
        }
    }

    /// Gate an attempt. `Err(CircuitOpen)` means the processor must not be
    /// invoked; an elapsed recovery timeout transitions Open to HalfOpen and
    /// admits the probe.
    pub async fn check(&self) -> Result<(), PatternError> {
        let mut state = self.state.lock().await;
        match *state {
            BreakerState::Closed { .. } | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open { opened_at } => {
                let elapsed_ms = opened_at.elapsed().as_millis() as u64;
                if elapsed_ms >= self.config.recovery_timeout_ms {
                    *state = BreakerState::HalfOpen;
                    Ok(())
                } else {
                    Err(PatternError::CircuitOpen {
                        pattern_id: self.pattern_id.clone(),
                        retry_in_ms: self.config.recovery_timeout_ms - elapsed_ms,
                    })
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        if matches!(*state, BreakerState::HalfOpen) {
            CircuitClosed {
                pattern_id: &self.pattern_id,
            }
            .log();
        }
        *state = BreakerState::Closed {
            consecutive_failures: 0,
            window_start: Instant::now(),
        };
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        match *state {
            BreakerState::Closed {
                consecutive_failures,
                window_start,
            } => {
                // Failures outside the monitoring window start a fresh count.
                let expired =
                    window_start.elapsed().as_millis() as u64 > self.config.monitoring_period_ms;
                let failures = if expired { 1 } else { consecutive_failures + 1 };
                let window_start = if expired { Instant::now() } else { window_start };

                if failures >= self.config.failure_threshold {
                    *state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                    CircuitOpened {
                        pattern_id: &self.pattern_id,
                        consecutive_failures: failures,
                    }
                    .log();
                } else {
                    *state = BreakerState::Closed {
                        consecutive_failures: failures,
                        window_start,
                    };
                }
            }
            BreakerState::HalfOpen => {
                // The probe failed; back to Open for another recovery window.
                *state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
            }
            BreakerState::Open { .. } => {}
        }
    }

    /// Current state name, for diagnostics and tests.
    pub async fn state_name(&self) -> &'static str {
        match *self.state.lock().await {
            BreakerState::Closed { .. } => "closed",
            BreakerState::Open { .. } => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    fn config(threshold: u32, recovery_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            enabled: true,
            failure_threshold: threshold,
            recovery_timeout_ms: recovery_ms,
            monitoring_period_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn trips_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new("p1", config(3, 10_000));
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert!(breaker.check().await.is_ok());
        breaker.record_failure().await;
        assert_eq!(breaker.state_name().await, "open");
        let err = breaker.check().await.unwrap_err();
        assert!(matches!(err, PatternError::CircuitOpen { .. }));
    }

    #[tokio::test]
    async fn success_resets_the_failure_count() {
        let breaker = CircuitBreaker::new("p1", config(2, 10_000));
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;
        // Never two consecutive failures, so still closed.
        assert_eq!(breaker.state_name().await, "closed");
    }

    #[tokio::test]
    async fn half_opens_after_recovery_and_closes_on_probe_success() {
        let breaker = CircuitBreaker::new("p1", config(1, 20));
        breaker.record_failure().await;
        assert_eq!(breaker.state_name().await, "open");

        sleep(Duration::from_millis(40)).await;
        assert!(breaker.check().await.is_ok());
        assert_eq!(breaker.state_name().await, "half_open");

        breaker.record_success().await;
        assert_eq!(breaker.state_name().await, "closed");
    }

    #[tokio::test]
    async fn failed_probe_reopens() {
        let breaker = CircuitBreaker::new("p1", config(1, 20));
        breaker.record_failure().await;
        sleep(Duration::from_millis(40)).await;
        assert!(breaker.check().await.is_ok());

        breaker.record_failure().await;
        assert_eq!(breaker.state_name().await, "open");
        assert!(breaker.check().await.is_err());
    }
}
