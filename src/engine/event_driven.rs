// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Event-driven dispatch: parse the input into an event envelope, run every
//! matching handler concurrently, and isolate per-handler failures so one
//! failing handler can neither block nor fail the others.

use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::PatternConfiguration;
use crate::engine::execution::ExecutionContext;
use crate::errors::PatternError;
use crate::observability::messages::step::HandlerFailed;
use crate::observability::messages::StructuredLog;
use crate::patterns::{EventEnvelope, EventHandler};

/// Dispatch one event against the pattern's handlers.
///
/// The output is the array of `{handler, output}` objects for the handlers
/// that succeeded, in registration order. Handler failures (errors and
/// timeouts alike) are logged and dropped from the output, never propagated.
pub(crate) async fn execute_event_driven(
    handlers: &[EventHandler],
    input: Value,
    ctx: &ExecutionContext,
    config: &PatternConfiguration,
    token: &CancellationToken,
) -> Result<Value, PatternError> {
    let envelope = EventEnvelope::parse(&input);
    let event_value = envelope.to_value();

    let matching: Vec<EventHandler> = handlers
        .iter()
        .filter(|handler| handler.matcher.matches(&envelope.event_type))
        .cloned()
        .collect();

    let mut handles = Vec::with_capacity(matching.len());
    for handler in matching {
        let handler_name = handler.processor.name().to_string();
        let handler_ctx = ctx.for_step(&handler_name);
        let event_value = event_value.clone();
        let timeout_ms = config.timeout_ms;
        let token = token.clone();
        handles.push((
            handler_name,
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => Err(anyhow::anyhow!("cancelled")),
                    outcome = timeout(
                        Duration::from_millis(timeout_ms),
                        handler.processor.process(event_value, &handler_ctx),
                    ) => match outcome {
                        Ok(result) => result,
                        Err(_) => Err(anyhow::anyhow!("handler timed out after {timeout_ms}ms")),
                    },
                }
            }),
        ));
    }

    let mut outputs = Vec::with_capacity(handles.len());
    for (handler_name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(anyhow::anyhow!("handler task aborted: {join_error}")),
        };
        match result {
            Ok(output) => outputs.push(json!({
                "handler": handler_name,
                "output": output,
            })),
            Err(error) => {
                HandlerFailed {
                    handler: &handler_name,
                    event_type: &envelope.event_type,
                    error: &format!("{error:#}"),
                }
                .log();
            }
        }
    }

    Ok(Value::Array(outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::EventMatcher;
    use crate::traits::{MemoryStore, StepProcessor};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo(&'static str);

    #[async_trait]
    impl StepProcessor for Echo {
        async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
            Ok(json!({ "seen_by": self.0, "type": input["type"] }))
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    struct Failing;

    #[async_trait]
    impl StepProcessor for Failing {
        async fn process(&self, _input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
            Err(anyhow::anyhow!("handler exploded"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn handler(matcher: EventMatcher, processor: Arc<dyn StepProcessor>) -> EventHandler {
        EventHandler { matcher, processor }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("p", "agent", Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn only_matching_handlers_run() {
        let handlers = vec![
            handler(EventMatcher::Exact("order.created".into()), Arc::new(Echo("orders"))),
            handler(EventMatcher::Exact("user.created".into()), Arc::new(Echo("users"))),
            handler(EventMatcher::Any, Arc::new(Echo("audit"))),
        ];
        let event = json!({"type": "order.created", "payload": {}});
        let output = execute_event_driven(
            &handlers,
            event,
            &ctx(),
            &PatternConfiguration::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let entries = output.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["handler"], "orders");
        assert_eq!(entries[1]["handler"], "audit");
    }

    #[tokio::test]
    async fn handler_failure_is_isolated() {
        let handlers = vec![
            handler(EventMatcher::Any, Arc::new(Failing)),
            handler(EventMatcher::Any, Arc::new(Echo("survivor"))),
        ];
        let output = execute_event_driven(
            &handlers,
            json!({"type": "ping"}),
            &ctx(),
            &PatternConfiguration::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let entries = output.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["handler"], "survivor");
    }

    #[tokio::test]
    async fn no_matching_handlers_yields_an_empty_array() {
        let handlers = vec![handler(
            EventMatcher::Exact("never".into()),
            Arc::new(Echo("unused")),
        )];
        let output = execute_event_driven(
            &handlers,
            json!({"type": "something.else"}),
            &ctx(),
            &PatternConfiguration::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(output, json!([]));
    }
}
