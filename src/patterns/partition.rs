// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Data partition and merge semantics shared by the parallel, fan-out, and
//! fan-in algorithms.

use serde_json::{Map, Value};

/// Split a value into `n` chunks for concurrent processing.
///
/// Non-array input is not partitionable and becomes a single chunk. Array
/// input is cut into `n` contiguous slices of `ceil(len / n)` elements;
/// trailing chunks may be shorter or empty, and empty chunks are still
/// produced so the branch count stays stable.
pub fn chunk_data(data: &Value, n: usize) -> Vec<Value> {
    let items = match data.as_array() {
        Some(items) => items,
        None => return vec![data.clone()],
    };
    let n = n.max(1);
    let chunk_size = items.len().div_ceil(n).max(1);

    (0..n)
        .map(|i| {
            let start = (i * chunk_size).min(items.len());
            let end = ((i + 1) * chunk_size).min(items.len());
            Value::Array(items[start..end].to_vec())
        })
        .collect()
}

/// Merge per-chunk results back into a single value.
///
/// Empty input merges to `Null` and a singleton merges to itself. When every
/// result is an array the merge is an order-preserving concatenation, which
/// is what makes chunk-then-merge reconstruct the original element order.
/// Anything else falls back to a shallow key-union over the object results,
/// where a later result overrides an earlier one on key collision; the merge
/// is deliberately not commutative. Non-object values contribute no keys in
/// that mode.
pub fn merge_results(results: Vec<Value>) -> Value {
    match results.len() {
        0 => return Value::Null,
        1 => return results.into_iter().next().unwrap(),
        _ => {}
    }

    if results.iter().all(Value::is_array) {
        let concatenated = results
            .into_iter()
            .flat_map(|r| match r {
                Value::Array(items) => items,
                _ => unreachable!(),
            })
            .collect();
        return Value::Array(concatenated);
    }

    let mut union = Map::new();
    for result in results {
        if let Value::Object(map) = result {
            for (key, value) in map {
                union.insert(key, value);
            }
        }
    }
    Value::Object(union)
}
