// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with a `Display`
//! implementation plus the [`messages::StructuredLog`] trait so that call
//! sites emit consistent, typed `tracing` events instead of ad-hoc strings.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - execution lifecycle events
//! * `messages::pattern` - pattern registration and deletion
//! * `messages::step` - step retries, dead letters, breaker transitions,
//!   and handler isolation

pub mod messages;
