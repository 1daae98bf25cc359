// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Content-based routing stage: classifies each line by severity markers
//! and forwards it unchanged under the matching tag.
//!
//! - lines containing `ERROR` route to `error`
//! - lines containing `WARN` route to `warn`
//! - everything else routes to `info`

use tagflow_domain::{Emission, FlowError, Processor, Tag};

/// Severity-classifying router stage.
pub struct Tagger {
    error: Tag,
    warn: Tag,
    info: Tag,
}

impl Tagger {
    pub fn new() -> Result<Self, FlowError> {
        Ok(Self {
            error: Tag::new("error")?,
            warn: Tag::new("warn")?,
            info: Tag::new("info")?,
        })
    }
}

impl Processor for Tagger {
    fn process(&mut self, line: &str) -> Result<Vec<Emission>, FlowError> {
        let tag = if line.contains("ERROR") {
            self.error.clone()
        } else if line.contains("WARN") {
            self.warn.clone()
        } else {
            self.info.clone()
        };
        Ok(vec![Emission::single(tag, line)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let mut stage = Tagger::new().unwrap();
        assert_eq!(stage.process("ERROR: boom").unwrap()[0].tags[0].as_str(), "error");
        assert_eq!(stage.process("WARN: odd").unwrap()[0].tags[0].as_str(), "warn");
        assert_eq!(stage.process("hello").unwrap()[0].tags[0].as_str(), "info");
    }

    #[test]
    fn test_line_passes_unchanged() {
        let mut stage = Tagger::new().unwrap();
        assert_eq!(stage.process("ERROR: boom").unwrap()[0].line, "ERROR: boom");
    }
}
