// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Per-stage execution counters. All counters are monotonic non-decreasing
//! for the life of the process; `avg_time` is derived on every update.

use serde::Serialize;

use crate::time::now_epoch_secs;

/// Seconds after which a stage with no traffic is reported as idle.
pub const ACTIVE_WINDOW_SECS: f64 = 60.0;

/// Counters for a single stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageMetrics {
    /// Number of times the stage was invoked.
    pub count: u64,
    /// Cumulative wall-clock seconds spent in the stage.
    pub total_time: f64,
    /// Number of failed invocations plus errors recorded against the stage.
    pub errors: u64,
    /// Derived average seconds per invocation.
    pub avg_time: f64,
    /// Seconds since epoch of the last invocation, if any.
    pub last_seen: Option<f64>,
}

impl StageMetrics {
    /// Records one invocation of the stage.
    pub fn record(&mut self, elapsed_secs: f64, success: bool) {
        self.count += 1;
        self.total_time += elapsed_secs;
        self.avg_time = self.total_time / self.count as f64;
        self.last_seen = Some(now_epoch_secs());
        if !success {
            self.errors += 1;
        }
    }

    /// Records an error attributed to the stage outside a timed invocation.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Whether the stage has seen traffic within the activity window.
    pub fn is_active(&self, now_secs: f64) -> bool {
        match self.last_seen {
            Some(seen) => now_secs - seen < ACTIVE_WINDOW_SECS,
            None => false,
        }
    }
}
