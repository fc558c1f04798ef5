// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Core data model: pattern descriptors, steps, performance statistics,
//! workflow graphs, and event envelopes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PatternConfiguration;
use crate::traits::StepProcessor;

/// The ten execution topologies the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Sequential,
    Parallel,
    Pipeline,
    FanOut,
    FanIn,
    MapReduce,
    Workflow,
    EventDriven,
    Streaming,
    Batch,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Sequential => "sequential",
            PatternType::Parallel => "parallel",
            PatternType::Pipeline => "pipeline",
            PatternType::FanOut => "fan_out",
            PatternType::FanIn => "fan_in",
            PatternType::MapReduce => "map_reduce",
            PatternType::Workflow => "workflow",
            PatternType::EventDriven => "event_driven",
            PatternType::Streaming => "streaming",
            PatternType::Batch => "batch",
        }
    }
}

/// A registered execution topology plus configuration and performance history.
///
/// Built by the pattern builders; mutated only by the engine after a run
/// (stats and `updated_at`); deleted only explicitly, which removes its steps
/// as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub name: String,
    pub pattern_type: PatternType,
    pub description: String,
    pub configuration: PatternConfiguration,
    pub stats: PerformanceStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rolling performance statistics for a pattern.
///
/// The update formulas are simple rolling averages folded in after each
/// execution; throughput is only refreshed on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Executions per second, derived from the last successful run.
    pub throughput: f64,
    pub average_latency_ms: f64,
    pub error_rate: f64,
    pub reliability: f64,
    pub resource_utilization: f64,
}

impl Default for PerformanceStats {
    fn default() -> Self {
        Self {
            throughput: 0.0,
            average_latency_ms: 0.0,
            error_rate: 0.0,
            reliability: 1.0,
            resource_utilization: 0.0,
        }
    }
}

impl PerformanceStats {
    /// Fold one execution outcome into the rolling averages.
    pub fn record(&mut self, duration_ms: f64, success: bool) {
        let indicator = if success { 1.0 } else { 0.0 };
        self.average_latency_ms = (self.average_latency_ms + duration_ms) / 2.0;
        self.reliability = (self.reliability + indicator) / 2.0;
        self.error_rate = (self.error_rate + (1.0 - indicator)) / 2.0;
        if success && duration_ms > 0.0 {
            self.throughput = 1000.0 / duration_ms;
        }
    }
}

/// A dependency-scheduled unit of work wrapping a caller-supplied processor.
///
/// Immutable once built; for workflow patterns the dependency-sorted step set
/// is fixed at build time and reused by every execution.
#[derive(Clone)]
pub struct Step {
    pub id: String,
    pub name: String,
    pub processor: Arc<dyn StepProcessor>,
    /// Ids of steps that must complete before this one is eligible.
    pub depends_on: Vec<String>,
    pub parallelism: usize,
    /// Overrides the pattern-level retry policy when present.
    pub retry: Option<crate::config::RetryPolicy>,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("processor", &self.processor.name())
            .field("depends_on", &self.depends_on)
            .field("parallelism", &self.parallelism)
            .finish()
    }
}

/// Caller-supplied node/edge description for workflow patterns.
pub struct WorkflowGraph {
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

pub struct WorkflowNode {
    pub id: String,
    pub processor: Arc<dyn StepProcessor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub from: String,
    pub to: String,
}

/// A named stage in a pipeline pattern. All steps of a stage depend on the
/// entire previous stage (stage barrier), not on individual steps.
pub struct PipelineStage {
    pub name: String,
    pub processors: Vec<Arc<dyn StepProcessor>>,
}

/// Parsed event envelope consumed by event-driven patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    pub event_type: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    pub metadata: HashMap<String, Value>,
}

impl EventEnvelope {
    /// Parse an envelope from an arbitrary input value.
    ///
    /// Parsing is lenient: a missing id gets a fresh uuid, a missing
    /// timestamp becomes now, missing type/source become empty strings, and a
    /// non-object input is treated as the payload of an untyped event.
    pub fn parse(input: &Value) -> Self {
        let object = input.as_object();

        let field = |key: &str| -> Option<&Value> { object.and_then(|map| map.get(key)) };

        let id = field("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let event_type = field("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let source = field("source")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let timestamp = field("timestamp")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
            .unwrap_or_else(Utc::now);
        let payload = match field("payload") {
            Some(payload) => payload.clone(),
            None if object.is_some() => Value::Null,
            None => input.clone(),
        };
        let metadata = field("metadata")
            .and_then(Value::as_object)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Self {
            id,
            event_type,
            source,
            timestamp,
            payload,
            metadata,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// How an event handler decides whether it wants an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum EventMatcher {
    /// Matches the event type exactly.
    Exact(String),
    /// Matches any event type starting with the given prefix.
    Prefix(String),
    /// Matches every event.
    Any,
}

impl EventMatcher {
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            EventMatcher::Exact(expected) => event_type == expected,
            EventMatcher::Prefix(prefix) => event_type.starts_with(prefix.as_str()),
            EventMatcher::Any => true,
        }
    }
}

/// A matcher/processor pair registered against an event-driven pattern.
#[derive(Clone)]
pub struct EventHandler {
    pub matcher: EventMatcher,
    pub processor: Arc<dyn StepProcessor>,
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler")
            .field("matcher", &self.matcher)
            .field("processor", &self.processor.name())
            .finish()
    }
}
