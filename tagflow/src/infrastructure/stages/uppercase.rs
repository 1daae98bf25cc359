// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Uppercases every line and forwards it to a fixed tag.

use tagflow_domain::{Emission, FlowError, Processor, Tag};

/// Uppercasing transform stage.
pub struct Uppercase {
    tag: Tag,
}

impl Uppercase {
    pub fn new() -> Self {
        Self { tag: Tag::end() }
    }

    pub fn with_tag(tag: Tag) -> Self {
        Self { tag }
    }
}

impl Default for Uppercase {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Uppercase {
    fn process(&mut self, line: &str) -> Result<Vec<Emission>, FlowError> {
        Ok(vec![Emission::single(self.tag.clone(), line.to_uppercase())])
    }
}
