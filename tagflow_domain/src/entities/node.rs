// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Routing Node
//!
//! A [`RoutingNode`] is one entry in the routing graph: a unique tag, the
//! processor instance bound to it, and the downstream tags the config
//! declares. The declared routes are advisory - they feed static validation
//! and the warnings for unreachable nodes and cycles - while actual routing
//! follows the tags stages emit at runtime.

use crate::services::processor::Processor;
use crate::value_objects::tag::Tag;

/// One node of the routing graph.
pub struct RoutingNode {
    tag: Tag,
    processor: Box<dyn Processor>,
    routes: Vec<Tag>,
}

impl RoutingNode {
    pub fn new(tag: Tag, processor: Box<dyn Processor>, routes: Vec<Tag>) -> Self {
        Self { tag, processor, routes }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Statically declared downstream tags (advisory).
    pub fn routes(&self) -> &[Tag] {
        &self.routes
    }

    /// Mutable access to the processor; only the engine thread driving this
    /// node may call it.
    pub fn processor_mut(&mut self) -> &mut dyn Processor {
        self.processor.as_mut()
    }
}

impl std::fmt::Debug for RoutingNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingNode")
            .field("tag", &self.tag)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::processor::{Emission, FnStage};

    #[test]
    fn test_node_drives_its_processor() {
        let stage = FnStage::new(Tag::end(), |line: &str| line.to_uppercase());
        let mut node = RoutingNode::new(Tag::start(), Box::new(stage), vec![Tag::end()]);

        let out: Vec<Emission> = node.processor_mut().process("abc").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].line, "ABC");
        assert_eq!(node.tag().as_str(), "start");
        assert_eq!(node.routes().len(), 1);
    }
}
