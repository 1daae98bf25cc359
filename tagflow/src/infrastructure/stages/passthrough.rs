// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Identity stage: forwards every line unchanged to a fixed tag (`end` by
//! default). Useful as a terminal leg of a routing graph and as the
//! reference point for the identity law - output must equal input, in
//! input order.

use tagflow_domain::{Emission, FlowError, Processor, Tag};

/// Forwards lines unchanged.
pub struct Passthrough {
    tag: Tag,
}

impl Passthrough {
    /// Passthrough emitting to the `end` sink.
    pub fn new() -> Self {
        Self { tag: Tag::end() }
    }

    /// Passthrough emitting to a custom tag.
    pub fn with_tag(tag: Tag) -> Self {
        Self { tag }
    }
}

impl Default for Passthrough {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Passthrough {
    fn process(&mut self, line: &str) -> Result<Vec<Emission>, FlowError> {
        Ok(vec![Emission::single(self.tag.clone(), line)])
    }
}
