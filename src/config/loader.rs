// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::ConfigurationOverride;
use crate::patterns::{EventMatcher, PatternType};

/// A pipeline definition file: one named pattern, its processors by catalog
/// name, and an optional configuration override.
///
/// Which sections are required depends on the declared pattern type; the
/// others stay empty. Example:
///
/// ```yaml
/// name: doubler
/// pattern: map_reduce
/// map: double_numbers
/// reduce: sum_numbers
/// config:
///   timeout_ms: 5000
///   retry:
///     max_attempts: 2
/// ```
#[derive(Debug, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub pattern: PatternType,
    /// sequential / streaming / batch
    #[serde(default)]
    pub processors: Vec<String>,
    /// parallel
    #[serde(default)]
    pub groups: Vec<Vec<String>>,
    /// pipeline
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
    /// fan_out
    pub source: Option<String>,
    #[serde(default)]
    pub branches: Vec<String>,
    /// fan_in
    #[serde(default)]
    pub sources: Vec<String>,
    pub aggregator: Option<String>,
    /// map_reduce
    pub map: Option<String>,
    pub reduce: Option<String>,
    /// workflow
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
    /// event_driven
    #[serde(default)]
    pub handlers: Vec<HandlerDefinition>,
    #[serde(default)]
    pub config: Option<ConfigurationOverride>,
}

#[derive(Debug, Deserialize)]
pub struct StageDefinition {
    pub name: String,
    pub processors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    pub processor: String,
}

#[derive(Debug, Deserialize)]
pub struct EdgeDefinition {
    pub from: String,
    pub to: String,
}

/// Handler entry: `event_type` of `"*"` matches everything, a trailing `*`
/// makes a prefix matcher, anything else matches exactly.
#[derive(Debug, Deserialize)]
pub struct HandlerDefinition {
    pub event_type: String,
    pub processor: String,
}

impl HandlerDefinition {
    pub fn matcher(&self) -> EventMatcher {
        if self.event_type == "*" {
            EventMatcher::Any
        } else if let Some(prefix) = self.event_type.strip_suffix('*') {
            EventMatcher::Prefix(prefix.to_string())
        } else {
            EventMatcher::Exact(self.event_type.clone())
        }
    }
}

/// Every processor name a definition references, in declaration order.
pub(crate) fn referenced_processors(definition: &PipelineDefinition) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    names.extend(definition.processors.iter().map(String::as_str));
    names.extend(definition.groups.iter().flatten().map(String::as_str));
    names.extend(
        definition
            .stages
            .iter()
            .flat_map(|s| s.processors.iter().map(String::as_str)),
    );
    names.extend(definition.source.as_deref());
    names.extend(definition.branches.iter().map(String::as_str));
    names.extend(definition.sources.iter().map(String::as_str));
    names.extend(definition.aggregator.as_deref());
    names.extend(definition.map.as_deref());
    names.extend(definition.reduce.as_deref());
    names.extend(definition.nodes.iter().map(|n| n.processor.as_str()));
    names.extend(definition.handlers.iter().map(|h| h.processor.as_str()));
    names
}

/// Load a pipeline definition from a YAML file.
pub fn load_definition<P: AsRef<Path>>(path: P) -> anyhow::Result<PipelineDefinition> {
    let content = fs::read_to_string(path)?;
    let definition: PipelineDefinition = serde_yaml::from_str(&content)?;
    Ok(definition)
}

/// Load a pipeline definition and validate it against the processor catalog.
pub fn load_and_validate_definition<P: AsRef<Path>>(path: P) -> anyhow::Result<PipelineDefinition> {
    let definition = load_definition(path)?;

    if let Err(validation_errors) = crate::config::validate_definition(&definition) {
        let messages: Vec<String> = validation_errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Definition validation failed:\n{}", messages.join("\n"));
    }

    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_definition(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn loads_a_sequential_definition() {
        let file = write_definition(
            r#"
name: demo
pattern: sequential
processors:
  - double_numbers
  - sum_numbers
config:
  concurrency: 2
  retry:
    max_attempts: 5
"#,
        );
        let definition = load_definition(file.path()).unwrap();
        assert_eq!(definition.name, "demo");
        assert_eq!(definition.pattern, PatternType::Sequential);
        assert_eq!(definition.processors, vec!["double_numbers", "sum_numbers"]);
        let config = definition.config.unwrap();
        assert_eq!(config.concurrency, Some(2));
        assert_eq!(config.retry.unwrap().max_attempts, Some(5));
    }

    #[test]
    fn loads_a_workflow_definition() {
        let file = write_definition(
            r#"
name: wf
pattern: workflow
nodes:
  - id: a
    processor: identity
  - id: b
    processor: identity
edges:
  - from: a
    to: b
"#,
        );
        let definition = load_definition(file.path()).unwrap();
        assert_eq!(definition.nodes.len(), 2);
        assert_eq!(definition.edges.len(), 1);
    }

    #[test]
    fn handler_matchers_cover_all_shapes() {
        let any = HandlerDefinition {
            event_type: "*".into(),
            processor: "identity".into(),
        };
        let prefix = HandlerDefinition {
            event_type: "order.*".into(),
            processor: "identity".into(),
        };
        let exact = HandlerDefinition {
            event_type: "order.created".into(),
            processor: "identity".into(),
        };
        assert_eq!(any.matcher(), EventMatcher::Any);
        assert_eq!(prefix.matcher(), EventMatcher::Prefix("order.".into()));
        assert_eq!(exact.matcher(), EventMatcher::Exact("order.created".into()));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let file = write_definition("name: [unterminated");
        assert!(load_definition(file.path()).is_err());
    }

    #[test]
    fn validation_rejects_unknown_processors() {
        let file = write_definition(
            r#"
name: broken
pattern: sequential
processors:
  - not_a_real_processor
"#,
        );
        let err = load_and_validate_definition(file.path()).unwrap_err();
        assert!(err.to_string().contains("not_a_real_processor"));
    }
}
