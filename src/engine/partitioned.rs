// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution of the partitioning family: parallel, fan-out, and fan-in.
//!
//! Branches run as concurrent tokio tasks. All branches are joined before the
//! algorithm returns, in declaration order, and the first failure (by that
//! order) propagates per the pattern's error-handling strategy: fail-fast
//! cancels the siblings through the execution token, every other strategy
//! lets them finish.

use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ErrorStrategy, PatternConfiguration};
use crate::engine::circuit_breaker::CircuitBreaker;
use crate::engine::execution::ExecutionContext;
use crate::engine::ordered::execute_ordered;
use crate::engine::step_runner::run_step;
use crate::errors::PatternError;
use crate::patterns::{chunk_data, merge_results, Step};

type BranchHandle = JoinHandle<Result<Value, PatternError>>;

/// Join spawned branches in declaration order, applying the error-handling
/// strategy, and hand back the per-branch outputs.
async fn join_branches(
    handles: Vec<BranchHandle>,
    strategy: ErrorStrategy,
    token: &CancellationToken,
) -> Result<Vec<Value>, PatternError> {
    let mut outputs = Vec::with_capacity(handles.len());
    let mut first_error: Option<PatternError> = None;

    for handle in handles {
        match handle.await {
            Ok(Ok(output)) => outputs.push(output),
            Ok(Err(error)) => {
                if first_error.is_none() {
                    if strategy == ErrorStrategy::FailFast {
                        token.cancel();
                    }
                    first_error = Some(error);
                }
            }
            Err(join_error) => {
                if first_error.is_none() {
                    first_error = Some(PatternError::Internal {
                        message: format!("branch task aborted: {join_error}"),
                    });
                }
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(outputs),
    }
}

/// Parallel: partition the input into `concurrency` chunks and run chunk *i*
/// through group `i mod G`'s step sequence, then merge in chunk order.
pub(crate) async fn execute_parallel(
    groups: &[(PatternConfiguration, Vec<Step>)],
    config: &PatternConfiguration,
    input: Value,
    ctx: &ExecutionContext,
    breaker: Option<&Arc<CircuitBreaker>>,
    success_ratio: f64,
    token: &CancellationToken,
) -> Result<Value, PatternError> {
    if groups.is_empty() {
        return Err(PatternError::Internal {
            message: "parallel pattern has no groups".into(),
        });
    }

    let chunks = chunk_data(&input, config.concurrency);
    let mut handles: Vec<BranchHandle> = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.into_iter().enumerate() {
        let (group_config, group_steps) = groups[index % groups.len()].clone();
        let ctx = ctx.clone();
        let breaker = breaker.cloned();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            execute_ordered(
                &group_steps,
                chunk,
                &ctx,
                &group_config,
                breaker.as_ref(),
                success_ratio,
                &token,
            )
            .await
        }));
    }

    let outputs = join_branches(handles, config.error_handling.strategy, token).await?;
    Ok(merge_results(outputs))
}

/// Fan-out: run the source over the whole input, partition its output across
/// the branches, and return the array of per-branch results, with no merge.
pub(crate) async fn execute_fan_out(
    steps: &[Step],
    input: Value,
    ctx: &ExecutionContext,
    config: &PatternConfiguration,
    breaker: Option<&Arc<CircuitBreaker>>,
    success_ratio: f64,
    token: &CancellationToken,
) -> Result<Value, PatternError> {
    let (source, branches) = steps.split_first().ok_or_else(|| PatternError::Internal {
        message: "fan-out pattern has no steps".into(),
    })?;

    let source_output = run_step(source, input, ctx, config, breaker, success_ratio, token).await?;
    let chunks = chunk_data(&source_output, branches.len());

    let mut handles: Vec<BranchHandle> = Vec::with_capacity(branches.len());
    for (branch, chunk) in branches.iter().zip(chunks) {
        let branch = branch.clone();
        let ctx = ctx.clone();
        let config = config.clone();
        let breaker = breaker.cloned();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            run_step(
                &branch,
                chunk,
                &ctx,
                &config,
                breaker.as_ref(),
                success_ratio,
                &token,
            )
            .await
        }));
    }

    let outputs = join_branches(handles, config.error_handling.strategy, token).await?;
    Ok(Value::Array(outputs))
}

/// Fan-in: run every source concurrently over the whole input, collect the
/// outputs in source order, and run the aggregator once over the collection.
pub(crate) async fn execute_fan_in(
    steps: &[Step],
    input: Value,
    ctx: &ExecutionContext,
    config: &PatternConfiguration,
    breaker: Option<&Arc<CircuitBreaker>>,
    success_ratio: f64,
    token: &CancellationToken,
) -> Result<Value, PatternError> {
    let (aggregator, sources) = steps.split_last().ok_or_else(|| PatternError::Internal {
        message: "fan-in pattern has no steps".into(),
    })?;

    let mut handles: Vec<BranchHandle> = Vec::with_capacity(sources.len());
    for source in sources {
        let source = source.clone();
        let input = input.clone();
        let ctx = ctx.clone();
        let config = config.clone();
        let breaker = breaker.cloned();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            run_step(
                &source,
                input,
                &ctx,
                &config,
                breaker.as_ref(),
                success_ratio,
                &token,
            )
            .await
        }));
    }

    let collected = join_branches(handles, config.error_handling.strategy, token).await?;
    run_step(
        aggregator,
        Value::Array(collected),
        ctx,
        config,
        breaker,
        success_ratio,
        token,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MemoryStore, StepProcessor};
    use async_trait::async_trait;
    use serde_json::json;

    struct Identity;

    #[async_trait]
    impl StepProcessor for Identity {
        async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
            Ok(input)
        }

        fn name(&self) -> &str {
            "identity"
        }
    }

    struct Count;

    #[async_trait]
    impl StepProcessor for Count {
        async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
            Ok(json!(input.as_array().map(Vec::len).unwrap_or(0)))
        }

        fn name(&self) -> &str {
            "count"
        }
    }

    fn make_step(id: &str, processor: Arc<dyn StepProcessor>, depends_on: Vec<String>) -> Step {
        Step {
            id: id.to_string(),
            name: processor.name().to_string(),
            processor,
            depends_on,
            parallelism: 1,
            retry: None,
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("p", "agent", Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn parallel_chunks_reassemble_in_order() {
        let groups = vec![(
            PatternConfiguration::default(),
            vec![make_step("step-0", Arc::new(Identity), Vec::new())],
        )];
        let mut config = PatternConfiguration::default();
        config.concurrency = 3;

        let output = execute_parallel(
            &groups,
            &config,
            json!([1, 2, 3, 4, 5, 6, 7]),
            &ctx(),
            None,
            1.0,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(output, json!([1, 2, 3, 4, 5, 6, 7]));
    }

    #[tokio::test]
    async fn fan_out_returns_per_branch_array() {
        let steps = vec![
            make_step("source", Arc::new(Identity), Vec::new()),
            make_step("branch-0", Arc::new(Count), vec!["source".into()]),
            make_step("branch-1", Arc::new(Count), vec!["source".into()]),
        ];
        let output = execute_fan_out(
            &steps,
            json!([1, 2, 3, 4]),
            &ctx(),
            &PatternConfiguration::default(),
            None,
            1.0,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        // Each branch saw a chunk of two elements; no merge happens.
        assert_eq!(output, json!([2, 2]));
    }

    #[tokio::test]
    async fn fan_in_aggregator_sees_sources_in_declaration_order() {
        struct Tag(&'static str);

        #[async_trait]
        impl StepProcessor for Tag {
            async fn process(&self, _input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
                Ok(json!(self.0))
            }

            fn name(&self) -> &str {
                self.0
            }
        }

        let steps = vec![
            make_step("source-0", Arc::new(Tag("alpha")), Vec::new()),
            make_step("source-1", Arc::new(Tag("beta")), Vec::new()),
            make_step("source-2", Arc::new(Tag("gamma")), Vec::new()),
            make_step(
                "aggregator",
                Arc::new(Identity),
                vec!["source-0".into(), "source-1".into(), "source-2".into()],
            ),
        ];
        let output = execute_fan_in(
            &steps,
            json!(null),
            &ctx(),
            &PatternConfiguration::default(),
            None,
            1.0,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(output, json!(["alpha", "beta", "gamma"]));
    }
}
