// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The pattern engine: an instance-owned registry of patterns, steps, event
//! handlers, and active executions, plus the dispatch loop that runs a
//! pattern against an input under its configured policy.
//!
//! All shared state lives on the engine instance, not in a process-wide
//! registry, so multiple engines coexist cleanly in one process. Registries
//! sit behind `tokio::sync::RwLock`; performance statistics are folded in
//! under the registry write lock so concurrent executions against the same
//! pattern cannot interleave a read-modify-write.
//!
//! `execute_pattern` is deliberately infallible at the signature level:
//! build-time problems surface from the `create_*` builders, but anything
//! that goes wrong during a run is captured in the returned
//! [`ExecutionResult`] (`success: false`, `error`) and never raised.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{ConfigurationOverride, ErrorStrategy};
use crate::engine::circuit_breaker::CircuitBreaker;
use crate::engine::event_driven::execute_event_driven;
use crate::engine::execution::{Execution, ExecutionContext, ExecutionResult, ExecutionStatus};
use crate::engine::ordered::execute_ordered;
use crate::engine::partitioned::{execute_fan_in, execute_fan_out, execute_parallel};
use crate::errors::PatternError;
use crate::observability::messages::engine::{
    ExecutionCancelled, ExecutionCompleted, ExecutionFailed, ExecutionStarted,
};
use crate::observability::messages::pattern::{PatternDeleted, PatternRegistered};
use crate::observability::messages::StructuredLog;
use crate::patterns::compiler::{
    compile_batch, compile_event_driven, compile_fan_in, compile_fan_out, compile_map_reduce,
    compile_parallel, compile_pipeline, compile_sequential, compile_streaming, compile_workflow,
};
use crate::patterns::{
    CompiledPattern, EventHandler, Pattern, PatternType, PerformanceStats, PipelineStage, Step,
    WorkflowGraph,
};
use crate::traits::{ContextStore, StepProcessor};

struct ActiveExecution {
    execution: Execution,
    token: CancellationToken,
}

/// The orchestration engine. Cheap to share behind an `Arc`.
pub struct PatternEngine {
    agent_id: String,
    store: Arc<dyn ContextStore>,
    patterns: RwLock<HashMap<String, Pattern>>,
    steps: RwLock<HashMap<String, Vec<Step>>>,
    /// Master parallel pattern id -> its per-group pattern ids.
    groups: RwLock<HashMap<String, Vec<String>>>,
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    active: RwLock<HashMap<String, ActiveExecution>>,
}

impl PatternEngine {
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        Self::with_agent_id(store, "loomwork")
    }

    pub fn with_agent_id(store: Arc<dyn ContextStore>, agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            store,
            patterns: RwLock::new(HashMap::new()),
            steps: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            breakers: RwLock::new(HashMap::new()),
            active: RwLock::new(HashMap::new()),
        }
    }

    // === Pattern builders ===

    pub async fn create_sequential_pattern(
        &self,
        name: &str,
        processors: Vec<Arc<dyn StepProcessor>>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_sequential(name, processors, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_parallel_pattern(
        &self,
        name: &str,
        groups: Vec<Vec<Arc<dyn StepProcessor>>>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_parallel(name, groups, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_pipeline_pattern(
        &self,
        name: &str,
        stages: Vec<PipelineStage>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_pipeline(name, stages, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_fan_out_pattern(
        &self,
        name: &str,
        source: Arc<dyn StepProcessor>,
        branches: Vec<Arc<dyn StepProcessor>>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_fan_out(name, source, branches, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_fan_in_pattern(
        &self,
        name: &str,
        sources: Vec<Arc<dyn StepProcessor>>,
        aggregator: Arc<dyn StepProcessor>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_fan_in(name, sources, aggregator, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_map_reduce_pattern(
        &self,
        name: &str,
        map: Arc<dyn StepProcessor>,
        reduce: Arc<dyn StepProcessor>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_map_reduce(name, map, reduce, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_workflow_pattern(
        &self,
        name: &str,
        graph: WorkflowGraph,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_workflow(name, graph, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_event_driven_pattern(
        &self,
        name: &str,
        handlers: Vec<EventHandler>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_event_driven(name, handlers, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_streaming_pattern(
        &self,
        name: &str,
        processors: Vec<Arc<dyn StepProcessor>>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_streaming(name, processors, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    pub async fn create_batch_pattern(
        &self,
        name: &str,
        processors: Vec<Arc<dyn StepProcessor>>,
        overrides: Option<ConfigurationOverride>,
    ) -> Result<Pattern, PatternError> {
        let compiled = compile_batch(name, processors, &overrides.unwrap_or_default())?;
        self.register(compiled).await
    }

    /// Insert a compiled pattern (and, for parallel masters, its per-group
    /// sub-patterns) into the registries and persist the snapshots.
    async fn register(&self, compiled: CompiledPattern) -> Result<Pattern, PatternError> {
        let CompiledPattern {
            pattern,
            steps,
            groups,
            handlers,
        } = compiled;

        // Group sub-patterns never nest further, so a flat loop suffices.
        let mut group_ids = Vec::with_capacity(groups.len());
        for group in groups {
            let registered = self.insert_pattern(group.pattern, group.steps, group.handlers).await;
            group_ids.push(registered.id);
        }

        let registered = self.insert_pattern(pattern, steps, handlers).await;
        if !group_ids.is_empty() {
            self.groups
                .write()
                .await
                .insert(registered.id.clone(), group_ids);
        }
        Ok(registered)
    }

    async fn insert_pattern(
        &self,
        pattern: Pattern,
        steps: Vec<Step>,
        handlers: Vec<EventHandler>,
    ) -> Pattern {
        PatternRegistered {
            pattern_id: &pattern.id,
            name: &pattern.name,
            pattern_type: pattern.pattern_type.as_str(),
            step_count: steps.len(),
        }
        .log();

        if let Ok(snapshot) = serde_json::to_value(&pattern) {
            let key = format!("pattern:{}", pattern.id);
            if let Err(error) = self.store.store(&key, snapshot).await {
                tracing::warn!(key = %key, error = %error, "failed to persist pattern snapshot");
            }
        }
        if !handlers.is_empty() {
            let registrations: Vec<Value> = handlers
                .iter()
                .map(|h| {
                    json!({
                        "matcher": h.matcher,
                        "processor": h.processor.name(),
                    })
                })
                .collect();
            let key = format!("pattern:{}:handlers", pattern.id);
            if let Err(error) = self.store.store(&key, Value::Array(registrations)).await {
                tracing::warn!(key = %key, error = %error, "failed to persist handler registrations");
            }
            self.handlers
                .write()
                .await
                .insert(pattern.id.clone(), handlers);
        }

        self.steps.write().await.insert(pattern.id.clone(), steps);
        self.patterns
            .write()
            .await
            .insert(pattern.id.clone(), pattern.clone());
        pattern
    }

    // === Execution ===

    /// Run a pattern against an input.
    ///
    /// Never returns an error: every failure mode, including an unknown
    /// pattern id, is reported through the result's `success`/`error` fields.
    pub async fn execute_pattern(&self, pattern_id: &str, input: Value) -> ExecutionResult {
        let started_at = Utc::now();
        let execution_id = Uuid::new_v4().to_string();

        let pattern = self.patterns.read().await.get(pattern_id).cloned();
        let pattern = match pattern {
            Some(pattern) => pattern,
            None => {
                let error = PatternError::PatternNotFound(pattern_id.to_string());
                ExecutionFailed {
                    execution_id: &execution_id,
                    pattern_id,
                    error: &error.to_string(),
                }
                .log();
                return ExecutionResult {
                    execution_id,
                    pattern_id: pattern_id.to_string(),
                    status: ExecutionStatus::Failed,
                    started_at,
                    ended_at: started_at,
                    duration_ms: 0,
                    input,
                    output: None,
                    metrics: HashMap::new(),
                    success: false,
                    error: Some(error.to_string()),
                };
            }
        };

        let ctx = ExecutionContext::new(&pattern.id, &self.agent_id, self.store.clone());
        let token = CancellationToken::new();
        let execution = Execution {
            id: execution_id.clone(),
            pattern_id: pattern.id.clone(),
            status: ExecutionStatus::Running,
            started_at,
            ended_at: None,
            input: input.clone(),
            output: None,
            error: None,
            metrics: HashMap::new(),
            context: ctx.clone(),
        };
        self.active.write().await.insert(
            execution_id.clone(),
            ActiveExecution {
                execution,
                token: token.clone(),
            },
        );

        ExecutionStarted {
            execution_id: &execution_id,
            pattern_id: &pattern.id,
            pattern_type: pattern.pattern_type.as_str(),
        }
        .log();

        let outcome = self.dispatch(&pattern, input.clone(), &ctx, &token).await;

        let ended_at = Utc::now();
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;

        let (status, output, error) = match outcome {
            // Work that finished before a late cancel still counts as completed.
            Ok(value) => (ExecutionStatus::Completed, Some(value), None),
            Err(error) => {
                let status = if matches!(error, PatternError::Cancelled(_)) {
                    ExecutionStatus::Cancelled
                } else {
                    ExecutionStatus::Failed
                };
                (status, None, Some(error.to_string()))
            }
        };

        {
            let mut patterns = self.patterns.write().await;
            if let Some(pattern) = patterns.get_mut(pattern_id) {
                pattern
                    .stats
                    .record(duration_ms as f64, status == ExecutionStatus::Completed);
                pattern.updated_at = ended_at;
            }
        }
        self.active.write().await.remove(&execution_id);

        match status {
            ExecutionStatus::Completed => ExecutionCompleted {
                execution_id: &execution_id,
                pattern_id: &pattern.id,
                duration_ms,
            }
            .log(),
            ExecutionStatus::Cancelled => ExecutionCancelled {
                execution_id: &execution_id,
                pattern_id: &pattern.id,
            }
            .log(),
            _ => ExecutionFailed {
                execution_id: &execution_id,
                pattern_id: &pattern.id,
                error: error.as_deref().unwrap_or("unknown"),
            }
            .log(),
        }

        let mut metrics = HashMap::new();
        metrics.insert("duration_ms".to_string(), json!(duration_ms));
        metrics.insert(
            "pattern_type".to_string(),
            json!(pattern.pattern_type.as_str()),
        );

        ExecutionResult {
            execution_id,
            pattern_id: pattern.id,
            status,
            started_at,
            ended_at,
            duration_ms,
            input,
            output,
            metrics,
            success: status == ExecutionStatus::Completed,
            error,
        }
    }

    async fn dispatch(
        &self,
        pattern: &Pattern,
        input: Value,
        ctx: &ExecutionContext,
        token: &CancellationToken,
    ) -> Result<Value, PatternError> {
        let config = &pattern.configuration;
        let success_ratio = pattern.stats.reliability;
        let breaker = self.breaker_for(pattern).await;

        match pattern.pattern_type {
            PatternType::Sequential
            | PatternType::Pipeline
            | PatternType::Streaming
            | PatternType::Batch
            | PatternType::Workflow
            | PatternType::MapReduce => {
                let steps = self.steps_of(&pattern.id).await?;
                execute_ordered(
                    &steps,
                    input,
                    ctx,
                    config,
                    breaker.as_ref(),
                    success_ratio,
                    token,
                )
                .await
            }
            PatternType::Parallel => {
                let group_ids = self
                    .groups
                    .read()
                    .await
                    .get(&pattern.id)
                    .cloned()
                    .unwrap_or_default();
                let mut group_runs = Vec::with_capacity(group_ids.len());
                {
                    let patterns = self.patterns.read().await;
                    let steps = self.steps.read().await;
                    for group_id in &group_ids {
                        let configuration = patterns
                            .get(group_id)
                            .map(|p| p.configuration.clone())
                            .ok_or_else(|| PatternError::Internal {
                                message: format!("group pattern '{group_id}' missing"),
                            })?;
                        let group_steps = steps.get(group_id).cloned().unwrap_or_default();
                        group_runs.push((configuration, group_steps));
                    }
                }
                execute_parallel(
                    &group_runs,
                    config,
                    input,
                    ctx,
                    breaker.as_ref(),
                    success_ratio,
                    token,
                )
                .await
            }
            PatternType::FanOut => {
                let steps = self.steps_of(&pattern.id).await?;
                execute_fan_out(
                    &steps,
                    input,
                    ctx,
                    config,
                    breaker.as_ref(),
                    success_ratio,
                    token,
                )
                .await
            }
            PatternType::FanIn => {
                let steps = self.steps_of(&pattern.id).await?;
                execute_fan_in(
                    &steps,
                    input,
                    ctx,
                    config,
                    breaker.as_ref(),
                    success_ratio,
                    token,
                )
                .await
            }
            PatternType::EventDriven => {
                let handlers = self
                    .handlers
                    .read()
                    .await
                    .get(&pattern.id)
                    .cloned()
                    .unwrap_or_default();
                execute_event_driven(&handlers, input, ctx, config, token).await
            }
        }
    }

    async fn steps_of(&self, pattern_id: &str) -> Result<Vec<Step>, PatternError> {
        self.steps
            .read()
            .await
            .get(pattern_id)
            .cloned()
            .ok_or_else(|| PatternError::Internal {
                message: format!("step set for pattern '{pattern_id}' missing"),
            })
    }

    /// Lazily create the per-pattern breaker when the configuration calls for
    /// one.
    async fn breaker_for(&self, pattern: &Pattern) -> Option<Arc<CircuitBreaker>> {
        let handling = &pattern.configuration.error_handling;
        let wanted = handling.strategy == ErrorStrategy::CircuitBreaker
            || handling.circuit_breaker.enabled;
        if !wanted {
            return None;
        }
        let mut breakers = self.breakers.write().await;
        Some(
            breakers
                .entry(pattern.id.clone())
                .or_insert_with(|| {
                    Arc::new(CircuitBreaker::new(
                        &pattern.id,
                        handling.circuit_breaker.clone(),
                    ))
                })
                .clone(),
        )
    }

    // === Registry access ===

    pub async fn get_pattern(&self, pattern_id: &str) -> Option<Pattern> {
        self.patterns.read().await.get(pattern_id).cloned()
    }

    pub async fn get_all_patterns(&self) -> Vec<Pattern> {
        self.patterns.read().await.values().cloned().collect()
    }

    pub async fn get_pattern_metrics(
        &self,
        pattern_id: &str,
    ) -> Result<PerformanceStats, PatternError> {
        self.patterns
            .read()
            .await
            .get(pattern_id)
            .map(|p| p.stats.clone())
            .ok_or_else(|| PatternError::PatternNotFound(pattern_id.to_string()))
    }

    /// Snapshots of the currently running executions.
    pub async fn get_active_executions(&self) -> Vec<Execution> {
        self.active
            .read()
            .await
            .values()
            .map(|entry| entry.execution.clone())
            .collect()
    }

    /// Cooperatively cancel an in-flight execution: mark it cancelled and
    /// signal every running branch task through its token.
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<(), PatternError> {
        let mut active = self.active.write().await;
        match active.get_mut(execution_id) {
            Some(entry) => {
                entry.execution.status = ExecutionStatus::Cancelled;
                entry.token.cancel();
                Ok(())
            }
            None => Err(PatternError::ExecutionNotFound(execution_id.to_string())),
        }
    }

    /// Remove a pattern, its steps, its handlers, and, for parallel masters,
    /// its per-group sub-patterns.
    pub async fn delete_pattern(&self, pattern_id: &str) -> Result<(), PatternError> {
        self.patterns
            .write()
            .await
            .remove(pattern_id)
            .ok_or_else(|| PatternError::PatternNotFound(pattern_id.to_string()))?;
        self.steps.write().await.remove(pattern_id);
        self.handlers.write().await.remove(pattern_id);
        self.breakers.write().await.remove(pattern_id);

        let group_ids = self
            .groups
            .write()
            .await
            .remove(pattern_id)
            .unwrap_or_default();
        for group_id in &group_ids {
            self.patterns.write().await.remove(group_id);
            self.steps.write().await.remove(group_id);
            self.discard_snapshot(&format!("pattern:{group_id}")).await;
        }

        self.discard_snapshot(&format!("pattern:{pattern_id}")).await;
        self.discard_snapshot(&format!("pattern:{pattern_id}:handlers"))
            .await;

        PatternDeleted { pattern_id }.log();
        Ok(())
    }

    async fn discard_snapshot(&self, key: &str) {
        if let Err(error) = self.store.delete(key).await {
            tracing::warn!(key = %key, error = %error, "failed to delete store entry");
        }
    }
}
