// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Routing Config Loader
//!
//! Parses the YAML routing document into a validated node table.
//!
//! ## Schema
//!
//! ```yaml
//! start: start            # optional, default "start"
//! nodes:
//!   - tag: start          # required, unique
//!     type: stages.tagger.Tagger
//!     routes: [error, info]   # optional, advisory
//! ```
//!
//! ## Validation (in order)
//!
//! 1. The start node exists in `nodes`. A node tagged `end` is NOT required
//!    (the engine synthesizes the sink); if one is declared anyway it is
//!    accepted and dropped with a warning.
//! 2. All tags are unique within `nodes`.
//! 3. Every tag listed in any node's `routes` is another node tag or `end`.
//! 4. All `type` identifiers resolve against the stage registry.
//!
//! Non-fatal findings - nodes unreachable from the start tag and cycles in
//! the statically declared route graph - are logged as warnings. Routing at
//! runtime is driven by emitted tags, so the static graph is advisory.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use tagflow_domain::value_objects::tag::END_TAG;
use tagflow_domain::{FlowError, Tag};

use crate::infrastructure::stages::registry::StageRegistry;

/// One node entry as declared in the config document.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    tag: Tag,
    #[serde(rename = "type")]
    stage_type: String,
    #[serde(default)]
    routes: Vec<Tag>,
}

impl NodeSpec {
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// The dotted stage identifier resolved through the registry.
    pub fn stage_type(&self) -> &str {
        &self.stage_type
    }

    /// Statically declared downstream tags (advisory).
    pub fn routes(&self) -> &[Tag] {
        &self.routes
    }
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    start: Option<Tag>,
    #[serde(default)]
    nodes: Vec<NodeSpec>,
}

/// A parsed and validated routing configuration.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    start: Tag,
    nodes: Vec<NodeSpec>,
}

impl FlowConfig {
    /// Loads and validates a config document from a file.
    pub fn from_path(path: &Path, registry: &StageRegistry) -> Result<Self, FlowError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FlowError::io_error(format!("failed to read config '{}': {}", path.display(), e)))?;
        Self::from_yaml(&raw, registry)
    }

    /// Parses and validates a config document from a YAML string.
    pub fn from_yaml(raw: &str, registry: &StageRegistry) -> Result<Self, FlowError> {
        let document: ConfigDocument = serde_yaml::from_str(raw)
            .map_err(|e| FlowError::invalid_config(format!("malformed config document: {}", e)))?;

        let start = document.start.unwrap_or_else(Tag::start);
        let mut nodes = document.nodes;

        // An explicit `end` node is tolerated for compatibility and dropped:
        // the engine synthesizes the sink.
        if nodes.iter().any(|n| n.tag.is_end()) {
            warn!("config declares an explicit 'end' node; ignoring it (the sink is synthesized)");
            nodes.retain(|n| !n.tag.is_end());
        }

        let config = Self { start, nodes };
        config.validate(registry)?;
        config.report_static_graph_warnings();
        Ok(config)
    }

    /// The entry tag (default `start`).
    pub fn start(&self) -> &Tag {
        &self.start
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    fn validate(&self, registry: &StageRegistry) -> Result<(), FlowError> {
        // 1. start node present
        if !self.nodes.iter().any(|n| n.tag == self.start) {
            return Err(FlowError::invalid_config(format!(
                "config must include a '{}' node",
                self.start
            )));
        }

        // 2. unique tags
        let mut seen: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.tag.as_str()) {
                return Err(FlowError::invalid_config(format!(
                    "duplicate node tag '{}'",
                    node.tag
                )));
            }
        }

        // 3. every declared route resolves to a node tag or `end`
        for node in &self.nodes {
            for route in &node.routes {
                if !route.is_end() && !seen.contains(route.as_str()) {
                    return Err(FlowError::invalid_config(format!(
                        "node '{}' declares route to unknown tag '{}'",
                        node.tag, route
                    )));
                }
            }
        }

        // 4. every stage identifier resolves
        for node in &self.nodes {
            if !registry.contains(&node.stage_type) {
                return Err(FlowError::invalid_config(format!(
                    "node '{}' references unknown stage type '{}'",
                    node.tag, node.stage_type
                )));
            }
        }

        Ok(())
    }

    /// Logs warnings for unreachable nodes and static cycles. Neither is
    /// fatal: the declared routes are advisory.
    fn report_static_graph_warnings(&self) {
        let edges: HashMap<&str, Vec<&str>> = self
            .nodes
            .iter()
            .map(|n| {
                (
                    n.tag.as_str(),
                    n.routes.iter().map(|r| r.as_str()).filter(|r| *r != END_TAG).collect(),
                )
            })
            .collect();

        // Reachability from the start tag (BFS over declared routes)
        let mut reached: HashSet<&str> = HashSet::new();
        let mut frontier: VecDeque<&str> = VecDeque::new();
        reached.insert(self.start.as_str());
        frontier.push_back(self.start.as_str());
        while let Some(tag) = frontier.pop_front() {
            if let Some(next) = edges.get(tag) {
                for target in next.iter().copied() {
                    if reached.insert(target) {
                        frontier.push_back(target);
                    }
                }
            }
        }
        let unreachable: Vec<&str> = self
            .nodes
            .iter()
            .map(|n| n.tag.as_str())
            .filter(|t| !reached.contains(t))
            .collect();
        if !unreachable.is_empty() {
            warn!("unreachable nodes from '{}': {}", self.start, unreachable.join(", "));
        }

        // Cycle detection (iterative DFS, three colors)
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut colors: HashMap<&str, Color> = edges.keys().map(|t| (*t, Color::White)).collect();
        for root in edges.keys().copied() {
            if colors[root] != Color::White {
                continue;
            }
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            colors.insert(root, Color::Gray);
            while let Some((tag, next_idx)) = stack.pop() {
                let targets = &edges[tag];
                if next_idx < targets.len() {
                    stack.push((tag, next_idx + 1));
                    let target = targets[next_idx];
                    match colors.get(target).copied() {
                        Some(Color::White) => {
                            colors.insert(target, Color::Gray);
                            stack.push((target, 0));
                        }
                        Some(Color::Gray) => {
                            warn!("detected cycle in declared routing graph involving '{}'", target);
                        }
                        _ => {}
                    }
                } else {
                    colors.insert(tag, Color::Black);
                }
            }
        }
    }
}

/// Reads the `TRACE_ENABLED` environment default. Truthy values are `true`,
/// `1`, and `yes`, case-insensitive. Returns `None` when the variable is
/// unset; the CLI flag overrides whatever this reports.
pub fn trace_enabled_from_env() -> Option<bool> {
    std::env::var("TRACE_ENABLED")
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}
