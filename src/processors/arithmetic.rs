use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::ExecutionContext;
use crate::traits::StepProcessor;

/// Doubles every number in an array input. Non-numeric elements become 0.
pub struct DoubleNumbers;

#[async_trait]
impl StepProcessor for DoubleNumbers {
    async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
        let items = input
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("double_numbers expects an array, got {input}"))?;
        let doubled = items
            .iter()
            .map(|v| json!(v.as_f64().unwrap_or(0.0) * 2.0))
            .collect();
        Ok(Value::Array(doubled))
    }

    fn name(&self) -> &str {
        "double_numbers"
    }
}

/// Sums the numbers in an array input into a single value.
pub struct SumNumbers;

#[async_trait]
impl StepProcessor for SumNumbers {
    async fn process(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<Value> {
        let items = input
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("sum_numbers expects an array, got {input}"))?;
        let sum: f64 = items.iter().filter_map(Value::as_f64).sum();
        Ok(json!(sum))
    }

    fn name(&self) -> &str {
        "sum_numbers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MemoryStore;
    use std::sync::Arc;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("p", "a", Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn doubles_each_element() {
        let out = DoubleNumbers.process(json!([1, 2, 3]), &ctx()).await.unwrap();
        assert_eq!(out, json!([2.0, 4.0, 6.0]));
    }

    #[tokio::test]
    async fn sums_elements() {
        let out = SumNumbers.process(json!([2.0, 4.0, 6.0]), &ctx()).await.unwrap();
        assert_eq!(out, json!(12.0));
    }

    #[tokio::test]
    async fn non_array_input_is_an_error() {
        assert!(DoubleNumbers.process(json!(5), &ctx()).await.is_err());
        assert!(SumNumbers.process(json!("nope"), &ctx()).await.is_err());
    }
}
