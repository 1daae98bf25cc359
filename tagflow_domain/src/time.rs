// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Timestamp helpers. The observability surface speaks floating-point
//! seconds-since-epoch on the wire, so the domain records timestamps in
//! that representation from the start.

use chrono::{DateTime, Utc};

/// Current time as floating-point seconds since the Unix epoch.
pub fn now_epoch_secs() -> f64 {
    epoch_secs(Utc::now())
}

/// Converts a `DateTime<Utc>` to floating-point seconds since the epoch.
pub fn epoch_secs(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}
