// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for step-level retry, dead-letter, breaker, and handler
//! isolation events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A step failed with a retryable error and will be re-attempted.
///
/// # Log Level
/// `warn!` - Expected under fault, but worth surfacing
pub struct StepRetrying<'a> {
    pub step_id: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub error: &'a str,
}

impl Display for StepRetrying<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} attempt {}/{} failed, retrying in {}ms: {}",
            self.step_id, self.attempt, self.max_attempts, self.delay_ms, self.error
        )
    }
}

impl StructuredLog for StepRetrying<'_> {
    fn log(&self) {
        tracing::warn!(
            step_id = self.step_id,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            delay_ms = self.delay_ms,
            error = self.error,
            "{}", self
        );
    }
}

/// A retry-exhausted input was recorded to the dead-letter sink; the
/// execution continues without it.
///
/// # Log Level
/// `warn!` - Data was set aside for later inspection
pub struct StepDeadLettered<'a> {
    pub step_id: &'a str,
    pub key: &'a str,
    pub attempts: u32,
}

impl Display for StepDeadLettered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} dead-lettered after {} attempts under key {}",
            self.step_id, self.attempts, self.key
        )
    }
}

impl StructuredLog for StepDeadLettered<'_> {
    fn log(&self) {
        tracing::warn!(
            step_id = self.step_id,
            key = self.key,
            attempts = self.attempts,
            "{}", self
        );
    }
}

/// A permanently failed step resolved to its input under the fallback
/// strategy.
///
/// # Log Level
/// `warn!` - Degraded but continuing
pub struct StepFellBack<'a> {
    pub step_id: &'a str,
    pub error: &'a str,
}

impl Display for StepFellBack<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} fell back to its input after: {}",
            self.step_id, self.error
        )
    }
}

impl StructuredLog for StepFellBack<'_> {
    fn log(&self) {
        tracing::warn!(step_id = self.step_id, error = self.error, "{}", self);
    }
}

/// The circuit breaker tripped open for a pattern.
///
/// # Log Level
/// `warn!` - Downstream dependency is misbehaving
pub struct CircuitOpened<'a> {
    pub pattern_id: &'a str,
    pub consecutive_failures: u32,
}

impl Display for CircuitOpened<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Circuit opened for pattern {} after {} consecutive failures",
            self.pattern_id, self.consecutive_failures
        )
    }
}

impl StructuredLog for CircuitOpened<'_> {
    fn log(&self) {
        tracing::warn!(
            pattern_id = self.pattern_id,
            consecutive_failures = self.consecutive_failures,
            "{}", self
        );
    }
}

/// A half-open probe succeeded and the circuit closed again.
///
/// # Log Level
/// `info!` - Recovery event
pub struct CircuitClosed<'a> {
    pub pattern_id: &'a str,
}

impl Display for CircuitClosed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Circuit closed for pattern {}", self.pattern_id)
    }
}

impl StructuredLog for CircuitClosed<'_> {
    fn log(&self) {
        tracing::info!(pattern_id = self.pattern_id, "{}", self);
    }
}

/// An event handler failed; the failure is isolated and the remaining
/// handlers keep running.
///
/// # Log Level
/// `error!` - Handler bug or downstream fault
pub struct HandlerFailed<'a> {
    pub handler: &'a str,
    pub event_type: &'a str,
    pub error: &'a str,
}

impl Display for HandlerFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Handler {} failed on event type '{}': {}",
            self.handler, self.event_type, self.error
        )
    }
}

impl StructuredLog for HandlerFailed<'_> {
    fn log(&self) {
        tracing::error!(
            handler = self.handler,
            event_type = self.event_type,
            error = self.error,
            "{}", self
        );
    }
}
