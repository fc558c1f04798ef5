// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pattern registry events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A pattern was compiled and registered.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PatternRegistered<'a> {
    pub pattern_id: &'a str,
    pub name: &'a str,
    pub pattern_type: &'a str,
    pub step_count: usize,
}

impl Display for PatternRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered {} pattern '{}' ({}) with {} steps",
            self.pattern_type, self.name, self.pattern_id, self.step_count
        )
    }
}

impl StructuredLog for PatternRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            pattern_id = self.pattern_id,
            name = self.name,
            pattern_type = self.pattern_type,
            step_count = self.step_count,
            "{}", self
        );
    }
}

/// A pattern and its steps were removed from the registry.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PatternDeleted<'a> {
    pub pattern_id: &'a str,
}

impl Display for PatternDeleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Deleted pattern {}", self.pattern_id)
    }
}

impl StructuredLog for PatternDeleted<'_> {
    fn log(&self) {
        tracing::info!(pattern_id = self.pattern_id, "{}", self);
    }
}
