// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The resolved configuration model for a registered pattern, plus the
//! partial-override counterpart used by callers.
//!
//! Every pattern type has a default configuration ([`PatternConfiguration::defaults_for`]);
//! callers provide a [`ConfigurationOverride`] in which every field is
//! optional. [`merge_configuration`] resolves the two: a field present in the
//! override wins, an absent field inherits from the default, and nested
//! sections merge key-by-key rather than being replaced wholesale. The merge
//! is a pure function and cannot fail.

use serde::{Deserialize, Serialize};

use crate::config::consts::*;
use crate::patterns::PatternType;

/// Fully resolved configuration attached to a registered pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfiguration {
    /// Number of concurrent branches / chunks. Always at least 1.
    pub concurrency: usize,
    /// Per-step timeout in milliseconds.
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
    pub error_handling: ErrorHandling,
    pub load_balancing: LoadBalancing,
    pub monitoring: Monitoring,
    pub optimization: Optimization,
}

/// Retry behavior for a failed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Error-message fragments considered retryable. Empty means every
    /// processor failure is retryable.
    pub retryable_errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Linear,
    Exponential,
    Fixed,
    /// Scales the delay by the pattern's recent success ratio.
    Adaptive,
}

/// What the engine does once a step has permanently failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandling {
    pub strategy: ErrorStrategy,
    /// When set, retry-exhausted inputs are recorded to the store instead of
    /// failing the execution.
    pub dead_letter_queue: bool,
    pub error_threshold: f64,
    pub circuit_breaker: CircuitBreakerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    Retry,
    FailFast,
    Fallback,
    CircuitBreaker,
    DeadLetter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    /// Consecutive failures within the monitoring period that trip the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before probing again.
    pub recovery_timeout_ms: u64,
    /// Rolling window over which consecutive failures are counted.
    pub monitoring_period_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancing {
    pub strategy: LoadBalancingStrategy,
    pub health_checks: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingStrategy {
    RoundRobin,
    LeastConnections,
    WeightedRoundRobin,
    HashBased,
    Adaptive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitoring {
    pub metrics: bool,
    pub tracing: bool,
    pub logging: bool,
    pub alerting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    pub auto_scaling: bool,
    pub load_prediction: bool,
    pub resource_optimization: bool,
    pub adaptive_routing: bool,
}

impl Default for PatternConfiguration {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetryPolicy::default(),
            error_handling: ErrorHandling::default(),
            load_balancing: LoadBalancing::default(),
            monitoring: Monitoring::default(),
            optimization: Optimization::default(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffStrategy::Exponential,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            retryable_errors: Vec::new(),
        }
    }
}

impl Default for ErrorHandling {
    fn default() -> Self {
        Self {
            strategy: ErrorStrategy::Retry,
            dead_letter_queue: false,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout_ms: DEFAULT_RECOVERY_TIMEOUT_MS,
            monitoring_period_ms: DEFAULT_MONITORING_PERIOD_MS,
        }
    }
}

impl Default for LoadBalancing {
    fn default() -> Self {
        Self {
            strategy: LoadBalancingStrategy::RoundRobin,
            health_checks: false,
        }
    }
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            metrics: true,
            tracing: true,
            logging: true,
            alerting: false,
        }
    }
}

impl Default for Optimization {
    fn default() -> Self {
        Self {
            auto_scaling: false,
            load_prediction: false,
            resource_optimization: false,
            adaptive_routing: false,
        }
    }
}

impl PatternConfiguration {
    /// The default configuration for a pattern type.
    ///
    /// Sequential work is single-lane, parallel work spreads over four lanes
    /// with least-connections balancing, streaming trades long waits for
    /// dead-lettering, and batch runs one long-lived lane.
    pub fn defaults_for(pattern_type: PatternType) -> Self {
        let mut config = Self::default();
        match pattern_type {
            PatternType::Sequential => {
                config.concurrency = 1;
            }
            PatternType::Parallel => {
                config.concurrency = 4;
                config.load_balancing.strategy = LoadBalancingStrategy::LeastConnections;
            }
            PatternType::Streaming => {
                config.timeout_ms = STREAMING_TIMEOUT_MS;
                config.error_handling.strategy = ErrorStrategy::DeadLetter;
                config.error_handling.dead_letter_queue = true;
            }
            PatternType::Batch => {
                config.concurrency = 1;
                config.timeout_ms = BATCH_TIMEOUT_MS;
            }
            _ => {}
        }
        config
    }
}

/// Caller-supplied partial configuration. Every field is optional; nested
/// sections merge field-by-field into the pattern type's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationOverride {
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retry: Option<RetryPolicyOverride>,
    #[serde(default)]
    pub error_handling: Option<ErrorHandlingOverride>,
    #[serde(default)]
    pub load_balancing: Option<LoadBalancingOverride>,
    #[serde(default)]
    pub monitoring: Option<MonitoringOverride>,
    #[serde(default)]
    pub optimization: Option<OptimizationOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyOverride {
    pub max_attempts: Option<u32>,
    pub backoff: Option<BackoffStrategy>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub retryable_errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlingOverride {
    pub strategy: Option<ErrorStrategy>,
    pub dead_letter_queue: Option<bool>,
    pub error_threshold: Option<f64>,
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerOverride {
    pub enabled: Option<bool>,
    pub failure_threshold: Option<u32>,
    pub recovery_timeout_ms: Option<u64>,
    pub monitoring_period_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancingOverride {
    pub strategy: Option<LoadBalancingStrategy>,
    pub health_checks: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringOverride {
    pub metrics: Option<bool>,
    pub tracing: Option<bool>,
    pub logging: Option<bool>,
    pub alerting: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOverride {
    pub auto_scaling: Option<bool>,
    pub load_prediction: Option<bool>,
    pub resource_optimization: Option<bool>,
    pub adaptive_routing: Option<bool>,
}

/// Resolve a partial override against a default configuration.
///
/// Pure: neither input is mutated, nothing can fail. Fields present in the
/// override win; absent fields (and absent nested sections) inherit from the
/// default. Concurrency is clamped to at least 1.
pub fn merge_configuration(
    defaults: &PatternConfiguration,
    overrides: &ConfigurationOverride,
) -> PatternConfiguration {
    let mut merged = defaults.clone();

    if let Some(concurrency) = overrides.concurrency {
        merged.concurrency = concurrency.max(1);
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        merged.timeout_ms = timeout_ms;
    }

    if let Some(retry) = &overrides.retry {
        if let Some(max_attempts) = retry.max_attempts {
            merged.retry.max_attempts = max_attempts;
        }
        if let Some(backoff) = retry.backoff {
            merged.retry.backoff = backoff;
        }
        if let Some(base_delay_ms) = retry.base_delay_ms {
            merged.retry.base_delay_ms = base_delay_ms;
        }
        if let Some(max_delay_ms) = retry.max_delay_ms {
            merged.retry.max_delay_ms = max_delay_ms;
        }
        if let Some(retryable_errors) = &retry.retryable_errors {
            merged.retry.retryable_errors = retryable_errors.clone();
        }
    }

    if let Some(error_handling) = &overrides.error_handling {
        if let Some(strategy) = error_handling.strategy {
            merged.error_handling.strategy = strategy;
        }
        if let Some(dead_letter_queue) = error_handling.dead_letter_queue {
            merged.error_handling.dead_letter_queue = dead_letter_queue;
        }
        if let Some(error_threshold) = error_handling.error_threshold {
            merged.error_handling.error_threshold = error_threshold;
        }
        if let Some(circuit_breaker) = &error_handling.circuit_breaker {
            if let Some(enabled) = circuit_breaker.enabled {
                merged.error_handling.circuit_breaker.enabled = enabled;
            }
            if let Some(failure_threshold) = circuit_breaker.failure_threshold {
                merged.error_handling.circuit_breaker.failure_threshold = failure_threshold;
            }
            if let Some(recovery_timeout_ms) = circuit_breaker.recovery_timeout_ms {
                merged.error_handling.circuit_breaker.recovery_timeout_ms = recovery_timeout_ms;
            }
            if let Some(monitoring_period_ms) = circuit_breaker.monitoring_period_ms {
                merged.error_handling.circuit_breaker.monitoring_period_ms = monitoring_period_ms;
            }
        }
    }

    if let Some(load_balancing) = &overrides.load_balancing {
        if let Some(strategy) = load_balancing.strategy {
            merged.load_balancing.strategy = strategy;
        }
        if let Some(health_checks) = load_balancing.health_checks {
            merged.load_balancing.health_checks = health_checks;
        }
    }

    if let Some(monitoring) = &overrides.monitoring {
        if let Some(metrics) = monitoring.metrics {
            merged.monitoring.metrics = metrics;
        }
        if let Some(tracing) = monitoring.tracing {
            merged.monitoring.tracing = tracing;
        }
        if let Some(logging) = monitoring.logging {
            merged.monitoring.logging = logging;
        }
        if let Some(alerting) = monitoring.alerting {
            merged.monitoring.alerting = alerting;
        }
    }

    if let Some(optimization) = &overrides.optimization {
        if let Some(auto_scaling) = optimization.auto_scaling {
            merged.optimization.auto_scaling = auto_scaling;
        }
        if let Some(load_prediction) = optimization.load_prediction {
            merged.optimization.load_prediction = load_prediction;
        }
        if let Some(resource_optimization) = optimization.resource_optimization {
            merged.optimization.resource_optimization = resource_optimization;
        }
        if let Some(adaptive_routing) = optimization.adaptive_routing {
            merged.optimization.adaptive_routing = adaptive_routing;
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_override_is_identity() {
        let defaults = PatternConfiguration::defaults_for(PatternType::Sequential);
        let merged = merge_configuration(&defaults, &ConfigurationOverride::default());
        assert_eq!(merged, defaults);
    }

    #[test]
    fn full_override_wins_everywhere() {
        let defaults = PatternConfiguration::defaults_for(PatternType::Workflow);
        let overrides = ConfigurationOverride {
            concurrency: Some(8),
            timeout_ms: Some(1_000),
            retry: Some(RetryPolicyOverride {
                max_attempts: Some(7),
                backoff: Some(BackoffStrategy::Linear),
                base_delay_ms: Some(50),
                max_delay_ms: Some(5_000),
                retryable_errors: Some(vec!["unavailable".into()]),
            }),
            error_handling: Some(ErrorHandlingOverride {
                strategy: Some(ErrorStrategy::CircuitBreaker),
                dead_letter_queue: Some(true),
                error_threshold: Some(0.25),
                circuit_breaker: Some(CircuitBreakerOverride {
                    enabled: Some(true),
                    failure_threshold: Some(2),
                    recovery_timeout_ms: Some(100),
                    monitoring_period_ms: Some(200),
                }),
            }),
            load_balancing: Some(LoadBalancingOverride {
                strategy: Some(LoadBalancingStrategy::HashBased),
                health_checks: Some(true),
            }),
            monitoring: Some(MonitoringOverride {
                metrics: Some(false),
                tracing: Some(false),
                logging: Some(false),
                alerting: Some(true),
            }),
            optimization: Some(OptimizationOverride {
                auto_scaling: Some(true),
                load_prediction: Some(true),
                resource_optimization: Some(true),
                adaptive_routing: Some(true),
            }),
        };

        let merged = merge_configuration(&defaults, &overrides);
        let expected = PatternConfiguration {
            concurrency: 8,
            timeout_ms: 1_000,
            retry: RetryPolicy {
                max_attempts: 7,
                backoff: BackoffStrategy::Linear,
                base_delay_ms: 50,
                max_delay_ms: 5_000,
                retryable_errors: vec!["unavailable".into()],
            },
            error_handling: ErrorHandling {
                strategy: ErrorStrategy::CircuitBreaker,
                dead_letter_queue: true,
                error_threshold: 0.25,
                circuit_breaker: CircuitBreakerConfig {
                    enabled: true,
                    failure_threshold: 2,
                    recovery_timeout_ms: 100,
                    monitoring_period_ms: 200,
                },
            },
            load_balancing: LoadBalancing {
                strategy: LoadBalancingStrategy::HashBased,
                health_checks: true,
            },
            monitoring: Monitoring {
                metrics: false,
                tracing: false,
                logging: false,
                alerting: true,
            },
            optimization: Optimization {
                auto_scaling: true,
                load_prediction: true,
                resource_optimization: true,
                adaptive_routing: true,
            },
        };
        assert_eq!(merged, expected);
    }

    #[test]
    fn partial_nested_override_keeps_sibling_defaults() {
        let defaults = PatternConfiguration::defaults_for(PatternType::Sequential);
        let overrides = ConfigurationOverride {
            retry: Some(RetryPolicyOverride {
                max_attempts: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge_configuration(&defaults, &overrides);
        assert_eq!(merged.retry.max_attempts, 10);
        // Siblings inside the nested section fall back to the default, never to empty.
        assert_eq!(merged.retry.backoff, defaults.retry.backoff);
        assert_eq!(merged.retry.base_delay_ms, defaults.retry.base_delay_ms);
        assert_eq!(merged.concurrency, 1);
    }

    #[test]
    fn concurrency_is_clamped_to_one() {
        let defaults = PatternConfiguration::default();
        let overrides = ConfigurationOverride {
            concurrency: Some(0),
            ..Default::default()
        };
        assert_eq!(merge_configuration(&defaults, &overrides).concurrency, 1);
    }

    #[test]
    fn per_type_defaults_table() {
        struct TestCase {
            pattern_type: PatternType,
            expected_concurrency: usize,
            expected_timeout_ms: u64,
            expected_strategy: ErrorStrategy,
        }

        let test_cases = vec![
            TestCase {
                pattern_type: PatternType::Sequential,
                expected_concurrency: 1,
                expected_timeout_ms: DEFAULT_TIMEOUT_MS,
                expected_strategy: ErrorStrategy::Retry,
            },
            TestCase {
                pattern_type: PatternType::Parallel,
                expected_concurrency: 4,
                expected_timeout_ms: DEFAULT_TIMEOUT_MS,
                expected_strategy: ErrorStrategy::Retry,
            },
            TestCase {
                pattern_type: PatternType::Streaming,
                expected_concurrency: 4,
                expected_timeout_ms: STREAMING_TIMEOUT_MS,
                expected_strategy: ErrorStrategy::DeadLetter,
            },
            TestCase {
                pattern_type: PatternType::Batch,
                expected_concurrency: 1,
                expected_timeout_ms: BATCH_TIMEOUT_MS,
                expected_strategy: ErrorStrategy::Retry,
            },
            TestCase {
                pattern_type: PatternType::Workflow,
                expected_concurrency: DEFAULT_CONCURRENCY,
                expected_timeout_ms: DEFAULT_TIMEOUT_MS,
                expected_strategy: ErrorStrategy::Retry,
            },
        ];

        for case in test_cases {
            let config = PatternConfiguration::defaults_for(case.pattern_type);
            assert_eq!(
                config.concurrency, case.expected_concurrency,
                "concurrency for {:?}",
                case.pattern_type
            );
            assert_eq!(
                config.timeout_ms, case.expected_timeout_ms,
                "timeout for {:?}",
                case.pattern_type
            );
            assert_eq!(
                config.error_handling.strategy, case.expected_strategy,
                "strategy for {:?}",
                case.pattern_type
            );
        }
    }

    #[test]
    fn parallel_defaults_use_least_connections() {
        let config = PatternConfiguration::defaults_for(PatternType::Parallel);
        assert_eq!(
            config.load_balancing.strategy,
            LoadBalancingStrategy::LeastConnections
        );
    }

    #[test]
    fn streaming_defaults_enable_dead_letter_queue() {
        let config = PatternConfiguration::defaults_for(PatternType::Streaming);
        assert!(config.error_handling.dead_letter_queue);
    }
}
