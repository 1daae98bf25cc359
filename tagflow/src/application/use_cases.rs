// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Use cases: one module per CLI verb.

pub mod run_single;
pub mod run_watch;
pub mod validate_config;

pub use run_single::{run_single, SingleFileOptions};
pub use run_watch::{run_watch, WatchOptions};
pub use validate_config::validate_config;

use crate::infrastructure::config::loader::trace_enabled_from_env;

/// Resolves the tracing switch: explicit CLI flag, then the
/// `TRACE_ENABLED` environment default, then the mode default.
pub(crate) fn resolve_trace(flag: Option<bool>, mode_default: bool) -> bool {
    flag.or_else(trace_enabled_from_env).unwrap_or(mode_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_flag_wins() {
        assert!(resolve_trace(Some(true), false));
        assert!(!resolve_trace(Some(false), true));
    }

    #[test]
    fn test_mode_default_applies_without_flag_or_env() {
        // TRACE_ENABLED is not set in the test environment
        if trace_enabled_from_env().is_none() {
            assert!(resolve_trace(None, true));
            assert!(!resolve_trace(None, false));
        }
    }
}
