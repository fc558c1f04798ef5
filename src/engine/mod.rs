// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod circuit_breaker;
mod event_driven;
mod execution;
mod ordered;
mod partitioned;
mod pattern_engine;
mod step_runner;


pub use circuit_breaker::CircuitBreaker;
pub use execution::{Execution, ExecutionContext, ExecutionResult, ExecutionStatus};
pub use pattern_engine::PatternEngine;
