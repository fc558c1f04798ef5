// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Builders that turn processor lists, stage lists, or node/edge graphs into
//! a registered-ready [`Pattern`] plus its dependency-annotated [`Step`] set.
//!
//! All builders share the same skeleton: resolve the defaults for the pattern
//! type, deep-merge the caller's override, build the step topology, and hand
//! back a [`CompiledPattern`] for the engine to register. Structural problems
//! (no processors, unknown edge endpoints, cyclic graphs) are rejected here,
//! at build time. A pattern that registers is executable.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{merge_configuration, ConfigurationOverride, PatternConfiguration};
use crate::errors::PatternError;
use crate::patterns::scheduler::topological_sort;
use crate::patterns::types::{
    EventHandler, Pattern, PatternType, PerformanceStats, PipelineStage, Step, WorkflowGraph,
};
use crate::traits::StepProcessor;

/// Output of a builder: the pattern descriptor, its steps, and any
/// pattern-type extras (per-group sub-patterns for parallel, handlers for
/// event-driven).
#[derive(Debug)]
pub struct CompiledPattern {
    pub pattern: Pattern,
    pub steps: Vec<Step>,
    pub groups: Vec<CompiledPattern>,
    pub handlers: Vec<EventHandler>,
}

fn new_pattern(
    name: &str,
    pattern_type: PatternType,
    description: String,
    overrides: &ConfigurationOverride,
) -> Pattern {
    let now = Utc::now();
    Pattern {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        pattern_type,
        description,
        configuration: merge_configuration(
            &PatternConfiguration::defaults_for(pattern_type),
            overrides,
        ),
        stats: PerformanceStats::default(),
        created_at: now,
        updated_at: now,
    }
}

fn step(id: String, processor: Arc<dyn StepProcessor>, depends_on: Vec<String>, parallelism: usize) -> Step {
    let name = processor.name().to_string();
    Step {
        id,
        name,
        processor,
        depends_on,
        parallelism,
        retry: None,
    }
}

/// Chain processors into steps where step *i* depends on step *i-1*.
fn sequence_steps(processors: Vec<Arc<dyn StepProcessor>>) -> Vec<Step> {
    let mut steps = Vec::with_capacity(processors.len());
    for (index, processor) in processors.into_iter().enumerate() {
        let depends_on = if index == 0 {
            Vec::new()
        } else {
            vec![format!("step-{}", index - 1)]
        };
        steps.push(step(format!("step-{index}"), processor, depends_on, 1));
    }
    steps
}

fn require_processors(
    name: &str,
    count: usize,
) -> Result<(), PatternError> {
    if count == 0 {
        return Err(PatternError::InvalidPatternDefinition(format!(
            "pattern '{name}' has no processors"
        )));
    }
    Ok(())
}

pub fn compile_sequential(
    name: &str,
    processors: Vec<Arc<dyn StepProcessor>>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    require_processors(name, processors.len())?;
    let description = format!("Strict sequence of {} steps", processors.len());
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::Sequential, description, overrides),
        steps: sequence_steps(processors),
        groups: Vec::new(),
        handlers: Vec::new(),
    })
}

/// Parallel patterns compile to a master pattern with no steps of its own and
/// one internally-sequential sub-pattern per processor group; execution fans
/// input chunks across the groups.
pub fn compile_parallel(
    name: &str,
    groups: Vec<Vec<Arc<dyn StepProcessor>>>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    require_processors(name, groups.iter().map(Vec::len).sum())?;

    let compiled_groups = groups
        .into_iter()
        .enumerate()
        .map(|(index, processors)| {
            let group_name = format!("{name}-group-{index}");
            compile_sequential(&group_name, processors, overrides)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let description = format!("Parallel fan across {} groups", compiled_groups.len());
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::Parallel, description, overrides),
        steps: Vec::new(),
        groups: compiled_groups,
        handlers: Vec::new(),
    })
}

/// Pipeline stages impose a stage barrier: every step of stage *s* depends on
/// the entire step set of stage *s-1*, not on individual predecessors.
pub fn compile_pipeline(
    name: &str,
    stages: Vec<PipelineStage>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    require_processors(name, stages.iter().map(|s| s.processors.len()).sum())?;

    let mut seen = std::collections::HashSet::new();
    for stage in &stages {
        if stage.name.is_empty() {
            return Err(PatternError::InvalidPatternDefinition(format!(
                "pattern '{name}' has a stage with an empty name"
            )));
        }
        if !seen.insert(stage.name.clone()) {
            return Err(PatternError::InvalidPatternDefinition(format!(
                "pattern '{name}' declares stage '{}' twice",
                stage.name
            )));
        }
    }

    let mut steps = Vec::new();
    let mut previous_stage_ids: Vec<String> = Vec::new();
    for stage in stages {
        let mut stage_ids = Vec::with_capacity(stage.processors.len());
        for (index, processor) in stage.processors.into_iter().enumerate() {
            let id = format!("{}-{}", stage.name, index);
            steps.push(step(id.clone(), processor, previous_stage_ids.clone(), 1));
            stage_ids.push(id);
        }
        if !stage_ids.is_empty() {
            previous_stage_ids = stage_ids;
        }
    }

    let description = format!("Staged pipeline of {} steps", steps.len());
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::Pipeline, description, overrides),
        steps,
        groups: Vec::new(),
        handlers: Vec::new(),
    })
}

/// One source step feeding K branch steps that each depend only on the source.
pub fn compile_fan_out(
    name: &str,
    source: Arc<dyn StepProcessor>,
    branches: Vec<Arc<dyn StepProcessor>>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    require_processors(name, branches.len())?;

    let branch_count = branches.len();
    let mut steps = vec![step("source".to_string(), source, Vec::new(), 1)];
    for (index, processor) in branches.into_iter().enumerate() {
        steps.push(step(
            format!("branch-{index}"),
            processor,
            vec!["source".to_string()],
            branch_count,
        ));
    }

    let description = format!("Fan-out into {branch_count} branches");
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::FanOut, description, overrides),
        steps,
        groups: Vec::new(),
        handlers: Vec::new(),
    })
}

/// K independent source steps feeding one aggregator that depends on all of them.
pub fn compile_fan_in(
    name: &str,
    sources: Vec<Arc<dyn StepProcessor>>,
    aggregator: Arc<dyn StepProcessor>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    require_processors(name, sources.len())?;

    let source_count = sources.len();
    let mut steps = Vec::with_capacity(source_count + 1);
    let mut source_ids = Vec::with_capacity(source_count);
    for (index, processor) in sources.into_iter().enumerate() {
        let id = format!("source-{index}");
        steps.push(step(id.clone(), processor, Vec::new(), source_count));
        source_ids.push(id);
    }
    steps.push(step("aggregator".to_string(), aggregator, source_ids, 1));

    let description = format!("Fan-in from {source_count} sources");
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::FanIn, description, overrides),
        steps,
        groups: Vec::new(),
        handlers: Vec::new(),
    })
}

/// Exactly two steps: `map`, then `reduce` depending on it.
pub fn compile_map_reduce(
    name: &str,
    map: Arc<dyn StepProcessor>,
    reduce: Arc<dyn StepProcessor>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    let steps = vec![
        step("map".to_string(), map, Vec::new(), 1),
        step("reduce".to_string(), reduce, vec!["map".to_string()], 1),
    ];

    Ok(CompiledPattern {
        pattern: new_pattern(
            name,
            PatternType::MapReduce,
            "Map step followed by reduce step".to_string(),
            overrides,
        ),
        steps,
        groups: Vec::new(),
        handlers: Vec::new(),
    })
}

/// Arbitrary DAG supplied as nodes and edges. The graph is dependency-sorted
/// here, once; executions replay the frozen order. Cycles and edges that
/// reference undeclared nodes fail the build.
pub fn compile_workflow(
    name: &str,
    graph: WorkflowGraph,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    require_processors(name, graph.nodes.len())?;

    let node_ids: Vec<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
    for edge in &graph.edges {
        for endpoint in [&edge.from, &edge.to] {
            if !node_ids.contains(endpoint) {
                return Err(PatternError::InvalidPatternDefinition(format!(
                    "pattern '{name}' has an edge referencing unknown node '{endpoint}'"
                )));
            }
        }
    }

    let edge_pairs: Vec<(String, String)> = graph
        .edges
        .iter()
        .map(|e| (e.from.clone(), e.to.clone()))
        .collect();
    let ordered = topological_sort(&node_ids, &edge_pairs)?;

    let mut processors: HashMap<String, Arc<dyn StepProcessor>> = graph
        .nodes
        .into_iter()
        .map(|n| (n.id, n.processor))
        .collect();

    let mut incoming: HashMap<&str, Vec<String>> = HashMap::new();
    for (from, to) in &edge_pairs {
        incoming.entry(to.as_str()).or_default().push(from.clone());
    }

    let steps = ordered
        .into_iter()
        .map(|id| {
            let processor = processors
                .remove(&id)
                .ok_or_else(|| PatternError::Internal {
                    message: format!("sorted node '{id}' missing from node set"),
                })?;
            let depends_on = incoming.remove(id.as_str()).unwrap_or_default();
            Ok(step(id, processor, depends_on, 1))
        })
        .collect::<Result<Vec<_>, PatternError>>()?;

    let description = format!("Workflow DAG of {} nodes", steps.len());
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::Workflow, description, overrides),
        steps,
        groups: Vec::new(),
        handlers: Vec::new(),
    })
}

/// Event-driven patterns have no steps; matching handlers run per dispatched
/// event.
pub fn compile_event_driven(
    name: &str,
    handlers: Vec<EventHandler>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    if handlers.is_empty() {
        return Err(PatternError::InvalidPatternDefinition(format!(
            "pattern '{name}' registers no event handlers"
        )));
    }

    let description = format!("Event dispatch across {} handlers", handlers.len());
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::EventDriven, description, overrides),
        steps: Vec::new(),
        groups: Vec::new(),
        handlers,
    })
}

/// Sequential structure with streaming defaults (short timeout, dead-letter).
pub fn compile_streaming(
    name: &str,
    processors: Vec<Arc<dyn StepProcessor>>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    require_processors(name, processors.len())?;
    let description = format!("Continuous stream through {} steps", processors.len());
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::Streaming, description, overrides),
        steps: sequence_steps(processors),
        groups: Vec::new(),
        handlers: Vec::new(),
    })
}

/// Sequential structure with batch defaults (long timeout, single lane).
pub fn compile_batch(
    name: &str,
    processors: Vec<Arc<dyn StepProcessor>>,
    overrides: &ConfigurationOverride,
) -> Result<CompiledPattern, PatternError> {
    require_processors(name, processors.len())?;
    let description = format!("Bounded batch of {} steps", processors.len());
    Ok(CompiledPattern {
        pattern: new_pattern(name, PatternType::Batch, description, overrides),
        steps: sequence_steps(processors),
        groups: Vec::new(),
        handlers: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionContext;
    use crate::patterns::types::{EventMatcher, WorkflowEdge, WorkflowNode};
    use async_trait::async_trait;
    use serde_json::Value;

    struct Noop;

    #[async_trait]
    impl StepProcessor for Noop {
        async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
            Ok(input)
        }

        fn name(&self) -> &str {
            "noop"
        }
    }

    fn noops(n: usize) -> Vec<Arc<dyn StepProcessor>> {
        (0..n).map(|_| Arc::new(Noop) as Arc<dyn StepProcessor>).collect()
    }

    #[test]
    fn sequential_chains_dependencies() {
        let compiled = compile_sequential("seq", noops(3), &Default::default()).unwrap();
        assert_eq!(compiled.pattern.pattern_type, PatternType::Sequential);
        assert_eq!(compiled.pattern.configuration.concurrency, 1);
        assert_eq!(compiled.steps.len(), 3);
        assert!(compiled.steps[0].depends_on.is_empty());
        assert_eq!(compiled.steps[1].depends_on, vec!["step-0"]);
        assert_eq!(compiled.steps[2].depends_on, vec!["step-1"]);
    }

    #[test]
    fn sequential_with_no_processors_is_invalid() {
        let err = compile_sequential("empty", noops(0), &Default::default()).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPatternDefinition(_)));
    }

    #[test]
    fn parallel_builds_master_plus_groups() {
        let compiled =
            compile_parallel("par", vec![noops(2), noops(1)], &Default::default()).unwrap();
        assert!(compiled.steps.is_empty(), "master pattern carries no steps");
        assert_eq!(compiled.groups.len(), 2);
        assert_eq!(compiled.groups[0].steps.len(), 2);
        assert_eq!(compiled.groups[0].pattern.pattern_type, PatternType::Sequential);
        assert_eq!(compiled.pattern.configuration.concurrency, 4);
    }

    #[test]
    fn pipeline_barriers_span_whole_stages() {
        let stages = vec![
            PipelineStage {
                name: "extract".into(),
                processors: noops(2),
            },
            PipelineStage {
                name: "load".into(),
                processors: noops(1),
            },
        ];
        let compiled = compile_pipeline("pipe", stages, &Default::default()).unwrap();
        assert_eq!(compiled.steps.len(), 3);
        // Both extract steps are entry points.
        assert!(compiled.steps[0].depends_on.is_empty());
        assert!(compiled.steps[1].depends_on.is_empty());
        // The load step waits on the entire extract stage, not one step of it.
        assert_eq!(compiled.steps[2].depends_on, vec!["extract-0", "extract-1"]);
    }

    #[test]
    fn duplicate_stage_names_are_rejected() {
        let stages = vec![
            PipelineStage {
                name: "same".into(),
                processors: noops(1),
            },
            PipelineStage {
                name: "same".into(),
                processors: noops(1),
            },
        ];
        let err = compile_pipeline("pipe", stages, &Default::default()).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPatternDefinition(_)));
    }

    #[test]
    fn fan_out_branches_depend_only_on_source() {
        let compiled = compile_fan_out("fo", noops(1).pop().unwrap(), noops(3), &Default::default())
            .unwrap();
        assert_eq!(compiled.steps.len(), 4);
        assert!(compiled.steps[0].depends_on.is_empty());
        for branch in &compiled.steps[1..] {
            assert_eq!(branch.depends_on, vec!["source"]);
        }
    }

    #[test]
    fn fan_in_aggregator_depends_on_every_source() {
        let compiled = compile_fan_in("fi", noops(3), noops(1).pop().unwrap(), &Default::default())
            .unwrap();
        assert_eq!(compiled.steps.len(), 4);
        let aggregator = compiled.steps.last().unwrap();
        assert_eq!(
            aggregator.depends_on,
            vec!["source-0", "source-1", "source-2"]
        );
    }

    #[test]
    fn map_reduce_is_exactly_two_steps() {
        let compiled = compile_map_reduce(
            "mr",
            noops(1).pop().unwrap(),
            noops(1).pop().unwrap(),
            &Default::default(),
        )
        .unwrap();
        assert_eq!(compiled.steps.len(), 2);
        assert_eq!(compiled.steps[0].id, "map");
        assert_eq!(compiled.steps[1].id, "reduce");
        assert_eq!(compiled.steps[1].depends_on, vec!["map"]);
    }

    fn workflow_graph(
        nodes: &[&str],
        edges: &[(&str, &str)],
    ) -> WorkflowGraph {
        WorkflowGraph {
            nodes: nodes
                .iter()
                .map(|id| WorkflowNode {
                    id: id.to_string(),
                    processor: Arc::new(Noop),
                })
                .collect(),
            edges: edges
                .iter()
                .map(|(from, to)| WorkflowEdge {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn workflow_sorts_nodes_and_wires_incoming_edges() {
        let graph = workflow_graph(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
        let compiled = compile_workflow("wf", graph, &Default::default()).unwrap();
        let ids: Vec<&str> = compiled.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.last(), Some(&"c"), "converging node is always last");
        assert_eq!(compiled.steps[2].depends_on, vec!["a", "b"]);
    }

    #[test]
    fn cyclic_workflow_fails_the_build() {
        let graph = workflow_graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let err = compile_workflow("wf", graph, &Default::default()).unwrap_err();
        assert!(matches!(err, PatternError::CyclicGraph { .. }));
    }

    #[test]
    fn workflow_edge_to_unknown_node_fails_the_build() {
        let graph = workflow_graph(&["a"], &[("a", "ghost")]);
        let err = compile_workflow("wf", graph, &Default::default()).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPatternDefinition(_)));
    }

    #[test]
    fn event_driven_requires_handlers() {
        let err = compile_event_driven("ev", Vec::new(), &Default::default()).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPatternDefinition(_)));

        let compiled = compile_event_driven(
            "ev",
            vec![EventHandler {
                matcher: EventMatcher::Any,
                processor: Arc::new(Noop),
            }],
            &Default::default(),
        )
        .unwrap();
        assert!(compiled.steps.is_empty());
        assert_eq!(compiled.handlers.len(), 1);
    }

    #[test]
    fn streaming_and_batch_carry_their_defaults() {
        let streaming = compile_streaming("st", noops(2), &Default::default()).unwrap();
        assert!(streaming.pattern.configuration.error_handling.dead_letter_queue);

        let batch = compile_batch("ba", noops(2), &Default::default()).unwrap();
        assert_eq!(batch.pattern.configuration.concurrency, 1);
        assert_eq!(batch.steps.len(), 2);
        assert_eq!(batch.steps[1].depends_on, vec!["step-0"]);
    }
}
