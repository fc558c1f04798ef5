// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of pipeline definition files, before any pattern is
//! built: the sections the declared pattern type needs must be present, every
//! referenced processor must resolve against the catalog, stage names must be
//! unique, and workflow edges must reference declared nodes. Cycle detection
//! happens in the builder, which refuses to register a cyclic graph.

use std::collections::HashSet;

use crate::config::loader::{referenced_processors, PipelineDefinition};
use crate::errors::DefinitionError;
use crate::patterns::PatternType;
use crate::processors::ProcessorCatalog;

/// Validate a definition, collecting every problem rather than stopping at
/// the first.
pub fn validate_definition(definition: &PipelineDefinition) -> Result<(), Vec<DefinitionError>> {
    let mut errors = Vec::new();

    check_required_sections(definition, &mut errors);

    for processor in referenced_processors(definition) {
        if !ProcessorCatalog::contains(processor) {
            errors.push(DefinitionError::UnknownProcessor {
                processor: processor.to_string(),
            });
        }
    }

    let mut stage_names = HashSet::new();
    for stage in &definition.stages {
        if !stage_names.insert(stage.name.as_str()) {
            errors.push(DefinitionError::DuplicateStage {
                stage: stage.name.clone(),
            });
        }
    }

    let node_ids: HashSet<&str> = definition.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &definition.edges {
        for endpoint in [&edge.from, &edge.to] {
            if !node_ids.contains(endpoint.as_str()) {
                errors.push(DefinitionError::UnknownNode {
                    node: endpoint.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_required_sections(definition: &PipelineDefinition, errors: &mut Vec<DefinitionError>) {
    let missing = |section: &'static str| DefinitionError::MissingSection {
        pattern_type: definition.pattern,
        section,
    };

    match definition.pattern {
        PatternType::Sequential | PatternType::Streaming | PatternType::Batch => {
            if definition.processors.is_empty() {
                errors.push(missing("processors"));
            }
        }
        PatternType::Parallel => {
            if definition.groups.iter().all(Vec::is_empty) {
                errors.push(missing("groups"));
            }
        }
        PatternType::Pipeline => {
            if definition.stages.is_empty() {
                errors.push(missing("stages"));
            }
        }
        PatternType::FanOut => {
            if definition.source.is_none() {
                errors.push(missing("source"));
            }
            if definition.branches.is_empty() {
                errors.push(missing("branches"));
            }
        }
        PatternType::FanIn => {
            if definition.sources.is_empty() {
                errors.push(missing("sources"));
            }
            if definition.aggregator.is_none() {
                errors.push(missing("aggregator"));
            }
        }
        PatternType::MapReduce => {
            if definition.map.is_none() {
                errors.push(missing("map"));
            }
            if definition.reduce.is_none() {
                errors.push(missing("reduce"));
            }
        }
        PatternType::Workflow => {
            if definition.nodes.is_empty() {
                errors.push(missing("nodes"));
            }
        }
        PatternType::EventDriven => {
            if definition.handlers.is_empty() {
                errors.push(missing("handlers"));
            }
        }
    }

    if referenced_processors(definition).is_empty() && definition.handlers.is_empty() {
        errors.push(DefinitionError::EmptyDefinition {
            name: definition.name.clone(),
        });
    }
}
