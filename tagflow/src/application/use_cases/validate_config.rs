// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Validate-Config Use Case
//!
//! Loads a routing config, runs the full validation pass (including the
//! unreachable-node and cycle warnings), and prints a node summary. Exits
//! non-zero on any validation failure, making it usable as a CI gate for
//! config changes.

use std::path::Path;

use tagflow_domain::FlowError;

use crate::infrastructure::config::loader::FlowConfig;
use crate::infrastructure::stages::registry::StageRegistry;

/// Validates the config at `path` and prints a summary to stdout.
pub fn validate_config(path: &Path) -> Result<(), FlowError> {
    let registry = StageRegistry::with_builtins();
    let config = FlowConfig::from_path(path, &registry)?;

    println!(
        "Configuration OK: {} node(s), start tag '{}'",
        config.nodes().len(),
        config.start()
    );
    for node in config.nodes() {
        let routes: Vec<&str> = node.routes().iter().map(|r| r.as_str()).collect();
        let routes = if routes.is_empty() {
            "(dynamic)".to_string()
        } else {
            routes.join(", ")
        };
        println!("  {} [{}] -> {}", node.tag(), node.stage_type(), routes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &path,
            "nodes:\n  - tag: start\n    type: stages.passthrough.Passthrough\n    routes: [end]\n",
        )
        .unwrap();
        assert!(validate_config(&path).is_ok());
    }

    #[test]
    fn test_invalid_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "nodes:\n  - tag: start\n    type: not.a.stage\n").unwrap();
        assert!(matches!(
            validate_config(&path).unwrap_err(),
            FlowError::InvalidConfiguration(_)
        ));
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(matches!(
            validate_config(Path::new("/nope/pipeline.yaml")).unwrap_err(),
            FlowError::IoError(_)
        ));
    }
}
