// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::patterns::PatternType;
use std::fmt;

/// Errors that can occur while validating a pipeline definition file
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    /// The definition declares no work at all
    EmptyDefinition {
        /// The definition name
        name: String,
    },
    /// A section required by the declared pattern type is missing or empty
    MissingSection {
        pattern_type: PatternType,
        section: &'static str,
    },
    /// A processor name could not be resolved against the catalog
    UnknownProcessor {
        /// The unresolved processor name
        processor: String,
    },
    /// Two pipeline stages share the same name
    DuplicateStage {
        stage: String,
    },
    /// A workflow edge references a node that was never declared
    UnknownNode {
        node: String,
    },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::EmptyDefinition { name } => {
                write!(f, "Definition '{}' declares no processors", name)
            }
            DefinitionError::MissingSection {
                pattern_type,
                section,
            } => {
                write!(
                    f,
                    "Pattern type '{:?}' requires a non-empty '{}' section",
                    pattern_type, section
                )
            }
            DefinitionError::UnknownProcessor { processor } => {
                write!(
                    f,
                    "Processor '{}' is not present in the processor catalog",
                    processor
                )
            }
            DefinitionError::DuplicateStage { stage } => {
                write!(f, "Duplicate stage name: '{}'", stage)
            }
            DefinitionError::UnknownNode { node } => {
                write!(f, "Edge references node '{}' which is not declared", node)
            }
        }
    }
}

impl std::error::Error for DefinitionError {}
