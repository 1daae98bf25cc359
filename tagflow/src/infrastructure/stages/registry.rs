// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Registry
//!
//! Maps the dotted stage identifiers used in config documents to factories
//! producing stage instances. The registry is static and pluggable: built-in
//! stages are pre-registered at construction, and callers may register
//! additional factories before loading a config.
//!
//! Each node entry in a config gets a *fresh* instance from its factory, so
//! the same stage type may be bound under multiple tags with independent
//! state. Resolution failure is a configuration error reported before the
//! engine starts.

use std::collections::HashMap;

use tagflow_domain::{FlowError, FnStage, Processor, Tag};

use crate::infrastructure::stages::{LineCounter, Passthrough, SplitLines, Tagger, Uppercase};

/// Factory producing one stage instance per node entry. Construction may
/// fail (e.g. invalid stage parameters), which surfaces as a configuration
/// error before the engine starts.
pub type StageFactory = Box<dyn Fn() -> Result<Box<dyn Processor>, FlowError> + Send + Sync>;

/// Registry of stage factories keyed by dotted identifier.
pub struct StageRegistry {
    factories: HashMap<String, StageFactory>,
}

impl StageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with all built-in stages pre-registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("stages.passthrough.Passthrough", || Ok(Box::new(Passthrough::new())));
        registry.register("stages.upper.Uppercase", || Ok(Box::new(Uppercase::new())));
        registry.register("stages.tagger.Tagger", || Ok(Box::new(Tagger::new()?)));
        registry.register("stages.splitter.SplitLines", || Ok(Box::new(SplitLines::default())));
        registry.register("stages.counter.LineCounter", || Ok(Box::new(LineCounter::default())));
        // Function-style identifier: a stateless closure wrapped by the
        // default-tag adapter.
        registry.register("stages.upper.upper", || {
            Ok(Box::new(FnStage::new(Tag::end(), |line: &str| line.to_uppercase())))
        });
        registry
    }

    /// Registers a factory under a dotted identifier, replacing any
    /// previous registration.
    pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Processor>, FlowError> + Send + Sync + 'static,
    {
        self.factories.insert(identifier.into(), Box::new(factory));
    }

    /// Whether an identifier is registered.
    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Instantiates a fresh stage for the given identifier.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidConfiguration` for unknown identifiers.
    pub fn resolve(&self, identifier: &str) -> Result<Box<dyn Processor>, FlowError> {
        match self.factories.get(identifier) {
            Some(factory) => factory(),
            None => Err(FlowError::invalid_config(format!(
                "unknown stage type '{}' (registered: {})",
                identifier,
                self.identifiers().join(", ")
            ))),
        }
    }

    /// All registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
