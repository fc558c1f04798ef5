// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for pattern building and execution.
//!
//! Build-time errors (`PatternNotFound`, `InvalidPatternDefinition`,
//! `CyclicGraph`) are returned synchronously from the builder calls.
//! Execution-time errors are absorbed by the engine and surfaced through
//! `ExecutionResult`, never raised to the caller of `execute_pattern`.

use thiserror::Error;

/// Comprehensive error type for pattern registration and execution.
#[derive(Error, Debug)]
pub enum PatternError {
    /// No pattern is registered under the given id.
    #[error("pattern '{0}' not found")]
    PatternNotFound(String),

    /// The pattern description cannot be compiled into a step set.
    #[error("invalid pattern definition: {0}")]
    InvalidPatternDefinition(String),

    /// The dependency graph contains a cycle (or an unresolvable reference).
    ///
    /// Raised at build time; a pattern with a cyclic graph is never registered.
    #[error("dependency graph contains a cycle involving: {}", nodes.join(", "))]
    CyclicGraph { nodes: Vec<String> },

    /// A step's processor failed. Carries the rendered error chain and
    /// whether the failure is retryable under the resolved retry policy.
    #[error("step '{step_id}' failed after {attempts} attempt(s): {message}")]
    StepExecution {
        step_id: String,
        attempts: u32,
        retryable: bool,
        message: String,
    },

    /// A step exceeded the configured timeout. Always retryable.
    #[error("step '{step_id}' timed out after {timeout_ms}ms")]
    Timeout { step_id: String, timeout_ms: u64 },

    /// The circuit breaker for the pattern is open; the processor was not invoked.
    #[error("circuit open for pattern '{pattern_id}', retry in {retry_in_ms}ms")]
    CircuitOpen { pattern_id: String, retry_in_ms: u64 },

    /// The execution was cancelled while this step was in flight.
    #[error("cancelled while running step '{0}'")]
    Cancelled(String),

    /// No active execution is registered under the given id.
    #[error("execution '{0}' not found")]
    ExecutionNotFound(String),

    /// Invariant violation inside the engine itself.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl PatternError {
    /// Whether the retry layer may re-attempt the failed step.
    pub fn is_retryable(&self) -> bool {
        match self {
            PatternError::Timeout { .. } => true,
            PatternError::StepExecution { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retryable() {
        let err = PatternError::Timeout {
            step_id: "step-0".into(),
            timeout_ms: 100,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn step_execution_carries_retryable_flag() {
        let err = PatternError::StepExecution {
            step_id: "step-0".into(),
            attempts: 3,
            retryable: false,
            message: "boom".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn circuit_open_is_not_retryable() {
        let err = PatternError::CircuitOpen {
            pattern_id: "p".into(),
            retry_in_ms: 500,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn cyclic_graph_names_the_offending_nodes() {
        let err = PatternError::CyclicGraph {
            nodes: vec!["a".into(), "b".into()],
        };
        assert!(err.to_string().contains("a, b"));
    }
}
