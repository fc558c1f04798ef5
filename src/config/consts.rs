// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Default values for the pattern configuration model.

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.5;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RECOVERY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MONITORING_PERIOD_MS: u64 = 60_000;

/// Streaming patterns favor fast failure over long waits.
pub const STREAMING_TIMEOUT_MS: u64 = 5_000;

/// Batch patterns tolerate long-running steps.
pub const BATCH_TIMEOUT_MS: u64 = 300_000;
