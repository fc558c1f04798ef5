// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod processor;
pub mod store;

pub use processor::StepProcessor;
pub use store::{ContextStore, MemoryStore};
