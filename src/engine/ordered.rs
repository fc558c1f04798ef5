// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution of the ordered family: sequential, pipeline, streaming, batch,
//! workflow, and the map/reduce pair. The step order was fixed at build time;
//! the current value is threaded through it, each step's output becoming the
//! next step's input.

use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::PatternConfiguration;
use crate::engine::circuit_breaker::CircuitBreaker;
use crate::engine::execution::ExecutionContext;
use crate::engine::step_runner::run_step;
use crate::errors::PatternError;
use crate::patterns::Step;

pub(crate) async fn execute_ordered(
    steps: &[Step],
    input: Value,
    ctx: &ExecutionContext,
    config: &PatternConfiguration,
    breaker: Option<&Arc<CircuitBreaker>>,
    success_ratio: f64,
    token: &CancellationToken,
) -> Result<Value, PatternError> {
    let mut current = input;
    for step in steps {
        current = run_step(step, current, ctx, config, breaker, success_ratio, token).await?;
    }
    Ok(current)
}
