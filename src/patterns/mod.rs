// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod compiler;
pub mod partition;
pub mod scheduler;
pub mod types;

pub use compiler::CompiledPattern;
pub use partition::{chunk_data, merge_results};
pub use scheduler::topological_sort;
pub use types::{
    EventEnvelope, EventHandler, EventMatcher, Pattern, PatternType, PerformanceStats,
    PipelineStage, Step, WorkflowEdge, WorkflowGraph, WorkflowNode,
};
