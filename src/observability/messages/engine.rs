// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for execution lifecycle events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An execution has been created and dispatched.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionStarted<'a> {
    pub execution_id: &'a str,
    pub pattern_id: &'a str,
    pub pattern_type: &'a str,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting {} execution {} for pattern {}",
            self.pattern_type, self.execution_id, self.pattern_id
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            execution_id = self.execution_id,
            pattern_id = self.pattern_id,
            pattern_type = self.pattern_type,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            execution_id = self.execution_id,
            pattern_id = self.pattern_id,
            pattern_type = self.pattern_type,
        )
    }
}

/// An execution reached a terminal state successfully.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionCompleted<'a> {
    pub execution_id: &'a str,
    pub pattern_id: &'a str,
    pub duration_ms: u64,
}

impl Display for ExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution {} for pattern {} completed in {}ms",
            self.execution_id, self.pattern_id, self.duration_ms
        )
    }
}

impl StructuredLog for ExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            execution_id = self.execution_id,
            pattern_id = self.pattern_id,
            duration_ms = self.duration_ms,
            "{}", self
        );
    }
}

/// An execution failed; the error is surfaced through the result, not raised.
///
/// # Log Level
/// `error!` - Operator attention likely required
pub struct ExecutionFailed<'a> {
    pub execution_id: &'a str,
    pub pattern_id: &'a str,
    pub error: &'a str,
}

impl Display for ExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution {} for pattern {} failed: {}",
            self.execution_id, self.pattern_id, self.error
        )
    }
}

impl StructuredLog for ExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            execution_id = self.execution_id,
            pattern_id = self.pattern_id,
            error = self.error,
            "{}", self
        );
    }
}

/// An in-flight execution was cancelled cooperatively.
///
/// # Log Level
/// `warn!` - Expected but noteworthy
pub struct ExecutionCancelled<'a> {
    pub execution_id: &'a str,
    pub pattern_id: &'a str,
}

impl Display for ExecutionCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution {} for pattern {} cancelled",
            self.execution_id, self.pattern_id
        )
    }
}

impl StructuredLog for ExecutionCancelled<'_> {
    fn log(&self) {
        tracing::warn!(
            execution_id = self.execution_id,
            pattern_id = self.pattern_id,
            "{}", self
        );
    }
}
