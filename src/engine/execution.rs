// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution records: one `Execution` per run of a pattern, the context handed
//! to processors, and the `ExecutionResult` returned to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::traits::ContextStore;

/// Execution state machine. `Pending → Running → {Completed, Failed,
/// Cancelled}`; the three right-hand states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context handed to every processor invocation.
///
/// The store and collaborator handles are opaque to the engine: the store is
/// only ever driven through `store`/`retrieve`/`delete`, and the collaborator
/// is never inspected at all; it exists so callers can thread their own
/// services through to processors.
#[derive(Clone)]
pub struct ExecutionContext {
    pub pattern_id: String,
    pub step_id: Option<String>,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub metadata: HashMap<String, Value>,
    pub store: Arc<dyn ContextStore>,
    pub collaborator: Option<Arc<dyn Any + Send + Sync>>,
}

impl ExecutionContext {
    pub fn new(pattern_id: &str, agent_id: &str, store: Arc<dyn ContextStore>) -> Self {
        Self {
            pattern_id: pattern_id.to_string(),
            step_id: None,
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4().to_string(),
            metadata: HashMap::new(),
            store,
            collaborator: None,
        }
    }

    /// The same context scoped to one step.
    pub fn for_step(&self, step_id: &str) -> Self {
        let mut ctx = self.clone();
        ctx.step_id = Some(step_id.to_string());
        ctx
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("pattern_id", &self.pattern_id)
            .field("step_id", &self.step_id)
            .field("agent_id", &self.agent_id)
            .field("correlation_id", &self.correlation_id)
            .field("metadata_keys", &self.metadata.keys().collect::<Vec<_>>())
            .field("has_collaborator", &self.collaborator.is_some())
            .finish()
    }
}

/// One run of a pattern against a specific input.
#[derive(Debug, Clone)]
pub struct Execution {
    pub id: String,
    pub pattern_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub input: Value,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub metrics: HashMap<String, Value>,
    pub context: ExecutionContext,
}

/// The structured outcome returned by `execute_pattern`. Failures are carried
/// here (`success: false`, `error`); the engine never raises out of
/// `execute_pattern` itself.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    pub pattern_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub input: Value,
    pub output: Option<Value>,
    pub metrics: HashMap<String, Value>,
    pub success: bool,
    pub error: Option<String>,
}
