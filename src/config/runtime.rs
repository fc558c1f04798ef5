// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Builds a registered pattern out of a validated pipeline definition,
//! resolving processor names through the builtin catalog.

use std::sync::Arc;

use crate::config::loader::PipelineDefinition;
use crate::engine::PatternEngine;
use crate::errors::PatternError;
use crate::patterns::{
    EventHandler, Pattern, PatternType, PipelineStage, WorkflowEdge, WorkflowGraph, WorkflowNode,
};
use crate::processors::ProcessorCatalog;
use crate::traits::StepProcessor;

pub struct DefinitionBuilder;

impl DefinitionBuilder {
    /// Register the definition's pattern with the engine.
    pub async fn build(
        engine: &PatternEngine,
        definition: &PipelineDefinition,
    ) -> Result<Pattern, PatternError> {
        let name = definition.name.as_str();
        let overrides = definition.config.clone();

        match definition.pattern {
            PatternType::Sequential => {
                engine
                    .create_sequential_pattern(name, resolve_all(&definition.processors)?, overrides)
                    .await
            }
            PatternType::Streaming => {
                engine
                    .create_streaming_pattern(name, resolve_all(&definition.processors)?, overrides)
                    .await
            }
            PatternType::Batch => {
                engine
                    .create_batch_pattern(name, resolve_all(&definition.processors)?, overrides)
                    .await
            }
            PatternType::Parallel => {
                let groups = definition
                    .groups
                    .iter()
                    .map(|group| resolve_all(group))
                    .collect::<Result<Vec<_>, _>>()?;
                engine.create_parallel_pattern(name, groups, overrides).await
            }
            PatternType::Pipeline => {
                let stages = definition
                    .stages
                    .iter()
                    .map(|stage| {
                        Ok(PipelineStage {
                            name: stage.name.clone(),
                            processors: resolve_all(&stage.processors)?,
                        })
                    })
                    .collect::<Result<Vec<_>, PatternError>>()?;
                engine.create_pipeline_pattern(name, stages, overrides).await
            }
            PatternType::FanOut => {
                let source = resolve(required(name, "source", definition.source.as_deref())?)?;
                engine
                    .create_fan_out_pattern(name, source, resolve_all(&definition.branches)?, overrides)
                    .await
            }
            PatternType::FanIn => {
                let aggregator =
                    resolve(required(name, "aggregator", definition.aggregator.as_deref())?)?;
                engine
                    .create_fan_in_pattern(name, resolve_all(&definition.sources)?, aggregator, overrides)
                    .await
            }
            PatternType::MapReduce => {
                let map = resolve(required(name, "map", definition.map.as_deref())?)?;
                let reduce = resolve(required(name, "reduce", definition.reduce.as_deref())?)?;
                engine
                    .create_map_reduce_pattern(name, map, reduce, overrides)
                    .await
            }
            PatternType::Workflow => {
                let nodes = definition
                    .nodes
                    .iter()
                    .map(|node| {
                        Ok(WorkflowNode {
                            id: node.id.clone(),
                            processor: resolve(&node.processor)?,
                        })
                    })
                    .collect::<Result<Vec<_>, PatternError>>()?;
                let edges = definition
                    .edges
                    .iter()
                    .map(|edge| WorkflowEdge {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                    })
                    .collect();
                engine
                    .create_workflow_pattern(name, WorkflowGraph { nodes, edges }, overrides)
                    .await
            }
            PatternType::EventDriven => {
                let handlers = definition
                    .handlers
                    .iter()
                    .map(|handler| {
                        Ok(EventHandler {
                            matcher: handler.matcher(),
                            processor: resolve(&handler.processor)?,
                        })
                    })
                    .collect::<Result<Vec<_>, PatternError>>()?;
                engine
                    .create_event_driven_pattern(name, handlers, overrides)
                    .await
            }
        }
    }
}

fn resolve(processor: &str) -> Result<Arc<dyn StepProcessor>, PatternError> {
    ProcessorCatalog::create(processor)
        .map_err(|e| PatternError::InvalidPatternDefinition(e.to_string()))
}

fn resolve_all(names: &[String]) -> Result<Vec<Arc<dyn StepProcessor>>, PatternError> {
    names.iter().map(|name| resolve(name)).collect()
}

fn required<'a>(
    pattern_name: &str,
    section: &str,
    value: Option<&'a str>,
) -> Result<&'a str, PatternError> {
    value.ok_or_else(|| {
        PatternError::InvalidPatternDefinition(format!(
            "pattern '{pattern_name}' is missing its '{section}' section"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionStatus;
    use crate::traits::MemoryStore;
    use serde_json::json;

    fn definition(yaml: &str) -> PipelineDefinition {
        serde_yaml::from_str(yaml).expect("definition parses")
    }

    #[tokio::test]
    async fn builds_and_runs_a_map_reduce_definition() {
        let engine = PatternEngine::new(Arc::new(MemoryStore::new()));
        let definition = definition(
            r#"
name: doubler
pattern: map_reduce
map: double_numbers
reduce: sum_numbers
"#,
        );
        let pattern = DefinitionBuilder::build(&engine, &definition).await.unwrap();

        let result = engine.execute_pattern(&pattern.id, json!([1, 2, 3])).await;
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.output, Some(json!(12.0)));
    }

    #[tokio::test]
    async fn builds_a_workflow_definition() {
        let engine = PatternEngine::new(Arc::new(MemoryStore::new()));
        let definition = definition(
            r#"
name: wf
pattern: workflow
nodes:
  - id: start
    processor: identity
  - id: finish
    processor: identity
edges:
  - from: start
    to: finish
"#,
        );
        let pattern = DefinitionBuilder::build(&engine, &definition).await.unwrap();
        assert_eq!(pattern.pattern_type, PatternType::Workflow);

        let result = engine.execute_pattern(&pattern.id, json!({"ok": true})).await;
        assert!(result.success);
        assert_eq!(result.output, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn unknown_processor_fails_the_build() {
        let engine = PatternEngine::new(Arc::new(MemoryStore::new()));
        let definition = definition(
            r#"
name: broken
pattern: sequential
processors: [does_not_exist]
"#,
        );
        let err = DefinitionBuilder::build(&engine, &definition).await.unwrap_err();
        assert!(matches!(err, PatternError::InvalidPatternDefinition(_)));
    }
}
