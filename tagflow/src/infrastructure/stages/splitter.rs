// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Fan-out stage: splits each line on a delimiter and emits one trimmed
//! part per emission, all carrying the same tag. With the default
//! configuration `"a, b,c"` becomes three independent lines `a`, `b`, `c`
//! headed to `end`.

use tagflow_domain::{Emission, FlowError, Processor, Tag};

/// Delimiter-splitting fan-out stage.
pub struct SplitLines {
    delimiter: char,
    tag: Tag,
}

impl SplitLines {
    pub fn new(delimiter: char, tag: Tag) -> Self {
        Self { delimiter, tag }
    }
}

impl Default for SplitLines {
    fn default() -> Self {
        Self {
            delimiter: ',',
            tag: Tag::end(),
        }
    }
}

impl Processor for SplitLines {
    fn process(&mut self, line: &str) -> Result<Vec<Emission>, FlowError> {
        Ok(line
            .split(self.delimiter)
            .map(|part| Emission::single(self.tag.clone(), part.trim()))
            .collect())
    }
}
