// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod engine;
pub mod pattern;
pub mod step;

use tracing::Span;

/// Common contract for structured log messages.
///
/// `log()` emits the message at its designated level with typed fields;
/// `span()` builds a tracing span carrying the same fields for callers that
/// want to scope work under the event.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("event", span_name = name)
    }
}
