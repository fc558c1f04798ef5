use async_trait::async_trait;
use serde_json::Value;

use crate::engine::ExecutionContext;
use crate::traits::StepProcessor;

/// Passes its input through untouched.
pub struct Identity;

#[async_trait]
impl StepProcessor for Identity {
    async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
        Ok(input)
    }

    fn name(&self) -> &str {
        "identity"
    }
}
