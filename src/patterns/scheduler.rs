// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Topological ordering over a dependency graph using Kahn's algorithm.
//!
//! The scheduler runs once at build time. A graph whose sort consumes fewer
//! nodes than were supplied contains a cycle or a dangling reference and is
//! rejected outright; it never reaches execution.

use std::collections::{HashMap, VecDeque};

use crate::errors::PatternError;

/// Order `nodes` so that every node appears after all of its predecessors.
///
/// `edges` are `(from, to)` pairs meaning `to` depends on `from`. Nodes with
/// no incoming edges are seeded in input order, which keeps the result stable
/// for a given call.
///
/// Returns `PatternError::CyclicGraph` naming the unprocessed nodes when the
/// graph cannot be fully ordered.
pub fn topological_sort(
    nodes: &[String],
    edges: &[(String, String)],
) -> Result<Vec<String>, PatternError> {
    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();

    for (from, to) in edges {
        successors.entry(from.as_str()).or_default().push(to.as_str());
        if let Some(degree) = in_degree.get_mut(to.as_str()) {
            *degree += 1;
        }
    }

    // Seed the ready queue with in-degree-zero nodes in input order.
    let mut ready: VecDeque<&str> = nodes
        .iter()
        .map(String::as_str)
        .filter(|n| in_degree.get(n) == Some(&0))
        .collect();

    let mut ordered = Vec::with_capacity(nodes.len());
    while let Some(current) = ready.pop_front() {
        ordered.push(current.to_string());
        if let Some(dependents) = successors.get(current) {
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }
    }

    if ordered.len() < nodes.len() {
        let mut unprocessed: Vec<String> = nodes
            .iter()
            .filter(|n| !ordered.contains(*n))
            .cloned()
            .collect();
        unprocessed.sort();
        return Err(PatternError::CyclicGraph { nodes: unprocessed });
    }

    Ok(ordered)
}
