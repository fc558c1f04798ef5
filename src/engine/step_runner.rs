// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single-step execution under the uniform fault-tolerance policy.
//!
//! Every processor invocation in every pattern goes through [`run_step`]:
//! per-attempt timeout, retry with configurable backoff, circuit-breaker
//! gating, and terminal resolution per the pattern's error-handling strategy
//! (fail permanently, fall back to the input, or dead-letter the input and
//! continue).

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::{BackoffStrategy, ErrorStrategy, PatternConfiguration, RetryPolicy};
use crate::engine::circuit_breaker::CircuitBreaker;
use crate::engine::execution::ExecutionContext;
use crate::errors::PatternError;
use crate::observability::messages::step::{StepDeadLettered, StepFellBack, StepRetrying};
use crate::observability::messages::StructuredLog;
use crate::patterns::Step;

/// Compute the delay before re-attempting a failed step.
///
/// `attempt` is the 1-based attempt that just failed. `success_ratio` is the
/// pattern's rolling reliability; the adaptive strategy stretches delays as
/// the ratio drops. All delays are capped at the policy's `max_delay_ms`.
pub(crate) fn backoff_delay(policy: &RetryPolicy, attempt: u32, success_ratio: f64) -> Duration {
    let base = policy.base_delay_ms;
    let delay_ms = match policy.backoff {
        BackoffStrategy::Linear => base.saturating_mul(attempt as u64),
        BackoffStrategy::Exponential => {
            let shift = (attempt.saturating_sub(1)).min(32);
            base.saturating_mul(1u64 << shift)
        }
        BackoffStrategy::Fixed => base,
        BackoffStrategy::Adaptive => {
            let factor = 2.0 - success_ratio.clamp(0.0, 1.0);
            ((attempt as f64) * (base as f64) * factor) as u64
        }
    };
    Duration::from_millis(delay_ms.min(policy.max_delay_ms))
}

/// Whether a processor failure may be retried under the policy.
///
/// An empty `retryable_errors` list retries everything; otherwise any listed
/// fragment must match the error chain, case-insensitively.
pub(crate) fn is_retryable(error: &anyhow::Error, policy: &RetryPolicy) -> bool {
    if policy.retryable_errors.is_empty() {
        return true;
    }
    let rendered = format!("{error:#}").to_lowercase();
    policy
        .retryable_errors
        .iter()
        .any(|fragment| rendered.contains(&fragment.to_lowercase()))
}

/// Execute one step to terminal resolution.
///
/// Returns the step output, or the step input when the strategy resolves a
/// permanent failure by falling back or dead-lettering. A returned error
/// means the failure must propagate to the execution.
pub(crate) async fn run_step(
    step: &Step,
    input: Value,
    ctx: &ExecutionContext,
    config: &PatternConfiguration,
    breaker: Option<&Arc<CircuitBreaker>>,
    success_ratio: f64,
    token: &CancellationToken,
) -> Result<Value, PatternError> {
    let policy = step.retry.as_ref().unwrap_or(&config.retry);
    let strategy = config.error_handling.strategy;
    let max_attempts = if strategy == ErrorStrategy::FailFast {
        1
    } else {
        policy.max_attempts.max(1)
    };
    let step_ctx = ctx.for_step(&step.id);

    let mut attempt = 1u32;
    loop {
        if token.is_cancelled() {
            return Err(PatternError::Cancelled(step.id.clone()));
        }
        if let Some(breaker) = breaker {
            breaker.check().await?;
        }

        let attempt_result = tokio::select! {
            _ = token.cancelled() => {
                return Err(PatternError::Cancelled(step.id.clone()));
            }
            outcome = timeout(
                Duration::from_millis(config.timeout_ms),
                step.processor.process(input.clone(), &step_ctx),
            ) => outcome,
        };

        let error = match attempt_result {
            Ok(Ok(output)) => {
                if let Some(breaker) = breaker {
                    breaker.record_success().await;
                }
                return Ok(output);
            }
            Ok(Err(processor_error)) => {
                let retryable = is_retryable(&processor_error, policy);
                PatternError::StepExecution {
                    step_id: step.id.clone(),
                    attempts: attempt,
                    retryable,
                    message: format!("{processor_error:#}"),
                }
            }
            Err(_) => PatternError::Timeout {
                step_id: step.id.clone(),
                timeout_ms: config.timeout_ms,
            },
        };

        if let Some(breaker) = breaker {
            breaker.record_failure().await;
        }

        if error.is_retryable() && attempt < max_attempts {
            let delay = backoff_delay(policy, attempt, success_ratio);
            StepRetrying {
                step_id: &step.id,
                attempt,
                max_attempts,
                delay_ms: delay.as_millis() as u64,
                error: &error.to_string(),
            }
            .log();
            tokio::time::sleep(delay).await;
            attempt += 1;
            continue;
        }

        return resolve_permanent_failure(step, input, &step_ctx, config, attempt, error).await;
    }
}

/// Resolve a step that has exhausted its attempts.
async fn resolve_permanent_failure(
    step: &Step,
    input: Value,
    ctx: &ExecutionContext,
    config: &PatternConfiguration,
    attempts: u32,
    error: PatternError,
) -> Result<Value, PatternError> {
    let handling = &config.error_handling;
    let dead_letter = handling.dead_letter_queue || handling.strategy == ErrorStrategy::DeadLetter;

    if dead_letter {
        let key = format!(
            "dead_letter:{}:{}:{}",
            ctx.pattern_id, ctx.correlation_id, step.id
        );
        let record = json!({
            "step_id": step.id,
            "input": input,
            "error": error.to_string(),
            "attempts": attempts,
        });
        if let Err(store_error) = ctx.store.store(&key, record).await {
            tracing::warn!(key = %key, error = %store_error, "failed to write dead-letter record");
        }
        StepDeadLettered {
            step_id: &step.id,
            key: &key,
            attempts,
        }
        .log();
        return Ok(input);
    }

    if handling.strategy == ErrorStrategy::Fallback {
        StepFellBack {
            step_id: &step.id,
            error: &error.to_string(),
        }
        .log();
        return Ok(input);
    }

    Err(error)
}
