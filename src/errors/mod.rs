// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod definition;
mod pattern;

pub use definition::DefinitionError;
pub use pattern::PatternError;
