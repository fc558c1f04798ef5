use async_trait::async_trait;
use serde_json::Value;

use crate::engine::ExecutionContext;

/// The unit-of-work contract supplied by the caller.
///
/// A processor receives the current data value and the execution context and
/// produces the next value. Any failure is returned as an opaque error and is
/// routed through the engine's uniform retry / error-handling layer; the
/// engine never inspects the error beyond matching it against the configured
/// retryable fragments.
#[async_trait]
pub trait StepProcessor: Send + Sync {
    async fn process(&self, input: Value, ctx: &ExecutionContext) -> anyhow::Result<Value>;

    fn name(&self) -> &str;
}

impl std::fmt::Debug for dyn StepProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepProcessor")
            .field("name", &self.name())
            .finish()
    }
}
