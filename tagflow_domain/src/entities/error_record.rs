// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A recorded failure, retained by the observability store in a bounded
//! ring.

use serde::Serialize;

use crate::time::now_epoch_secs;

/// One recorded error: the stage it is attributed to, the message, the
/// backtrace captured at the recording site, and optionally the line being
/// processed when the failure occurred.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub processor: String,
    pub message: String,
    pub stack_trace: String,
    pub timestamp: f64,
    pub line_content: Option<String>,
}

impl ErrorRecord {
    pub fn new(
        processor: impl Into<String>,
        message: impl Into<String>,
        stack_trace: impl Into<String>,
        line_content: Option<String>,
    ) -> Self {
        Self {
            processor: processor.into(),
            message: message.into(),
            stack_trace: stack_trace.into(),
            timestamp: now_epoch_secs(),
            line_content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_record_carries_context() {
        let rec = ErrorRecord::new("router", "unknown tag 'nope'", "", Some("a line".to_string()));
        assert_eq!(rec.processor, "router");
        assert_eq!(rec.line_content.as_deref(), Some("a line"));
        assert!(rec.timestamp > 0.0);
    }
}
