use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::ExecutionContext;
use crate::traits::StepProcessor;

/// Uppercases string input, or every string element of an array input.
pub struct UppercaseText;

#[async_trait]
impl StepProcessor for UppercaseText {
    async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
        let transformed = match input {
            Value::String(s) => json!(s.to_uppercase()),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|v| match v {
                        Value::String(s) => json!(s.to_uppercase()),
                        other => other,
                    })
                    .collect(),
            ),
            other => {
                return Err(anyhow::anyhow!(
                    "uppercase_text expects a string or array, got {other}"
                ))
            }
        };
        Ok(transformed)
    }

    fn name(&self) -> &str {
        "uppercase_text"
    }
}

/// Adds a fixed key/value entry to object input, leaving other keys alone.
pub struct Annotate {
    key: String,
    value: Value,
}

impl Annotate {
    pub fn new(key: &str, value: Value) -> Self {
        Self {
            key: key.to_string(),
            value,
        }
    }
}

#[async_trait]
impl StepProcessor for Annotate {
    async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
        let mut map = match input {
            Value::Object(map) => map,
            other => {
                return Err(anyhow::anyhow!("annotate expects an object, got {other}"));
            }
        };
        map.insert(self.key.clone(), self.value.clone());
        Ok(Value::Object(map))
    }

    fn name(&self) -> &str {
        "annotate"
    }
}
