// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Builtin processor catalog.
//!
//! Real deployments supply their own [`StepProcessor`](crate::traits::StepProcessor)
//! implementations; the catalog exists so pipeline definition files, the demo
//! binary, and tests have a small set of JSON-domain processors to wire up by
//! name.

mod arithmetic;
mod factory;
mod identity;
mod text;

pub use arithmetic::{DoubleNumbers, SumNumbers};
pub use factory::ProcessorCatalog;
pub use identity::Identity;
pub use text::{Annotate, UppercaseText};
