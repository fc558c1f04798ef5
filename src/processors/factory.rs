// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::errors::DefinitionError;
use crate::processors::{DoubleNumbers, Identity, SumNumbers, UppercaseText};
use crate::traits::StepProcessor;

/// Resolves catalog processor names from pipeline definition files.
pub struct ProcessorCatalog;

impl ProcessorCatalog {
    /// Instantiate a builtin processor by its catalog name.
    pub fn create(name: &str) -> Result<Arc<dyn StepProcessor>, DefinitionError> {
        match name {
            "identity" => Ok(Arc::new(Identity)),
            "double_numbers" => Ok(Arc::new(DoubleNumbers)),
            "sum_numbers" => Ok(Arc::new(SumNumbers)),
            "uppercase_text" => Ok(Arc::new(UppercaseText)),
            other => Err(DefinitionError::UnknownProcessor {
                processor: other.to_string(),
            }),
        }
    }

    /// Whether a catalog name resolves, without instantiating it.
    pub fn contains(name: &str) -> bool {
        Self::create(name).is_ok()
    }

    pub fn known_names() -> &'static [&'static str] {
        &["identity", "double_numbers", "sum_numbers", "uppercase_text"]
    }
}
