// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod configuration;
mod loader;
mod runtime;
mod validation;

pub mod consts;

pub use configuration::{
    merge_configuration, BackoffStrategy, CircuitBreakerConfig, CircuitBreakerOverride,
    ConfigurationOverride, ErrorHandling, ErrorHandlingOverride, ErrorStrategy, LoadBalancing,
    LoadBalancingOverride, LoadBalancingStrategy, Monitoring, MonitoringOverride, Optimization,
    OptimizationOverride, PatternConfiguration, RetryPolicy, RetryPolicyOverride,
};
pub use loader::{
    load_and_validate_definition, load_definition, EdgeDefinition, HandlerDefinition,
    NodeDefinition, PipelineDefinition, StageDefinition,
};
pub use runtime::DefinitionBuilder;
pub use validation::validate_definition;
