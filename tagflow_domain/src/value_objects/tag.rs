// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tag Value Object
//!
//! A [`Tag`] is the short ASCII identifier that names a routing stage and
//! drives dispatch: every envelope carries the tag of the stage it is headed
//! to, and every stage emission names the tags its output lines travel to
//! next.
//!
//! Two tags are reserved:
//!
//! - `start` - the entry node; every config must define a node with this tag
//! - `end` - the terminal sink; never appears in the node table but is a
//!   valid routing target everywhere
//!
//! ## Validation Rules
//!
//! - Non-empty, at most 64 bytes
//! - ASCII alphanumeric characters plus `_` and `-`
//!
//! Validation happens on construction and on deserialization, so a `Tag`
//! held anywhere in the system is always well-formed.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FlowError;

/// The reserved entry tag.
pub const START_TAG: &str = "start";

/// The reserved sink tag. Envelopes routed here are written to output.
pub const END_TAG: &str = "end";

/// Maximum accepted tag length in bytes.
const MAX_TAG_LEN: usize = 64;

/// A validated stage identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Creates a new tag, validating the identifier rules.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidConfiguration` when the value is empty,
    /// longer than 64 bytes, or contains characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, FlowError> {
        let value = value.into();
        if value.is_empty() {
            return Err(FlowError::invalid_config("tag must not be empty"));
        }
        if value.len() > MAX_TAG_LEN {
            return Err(FlowError::invalid_config(format!(
                "tag '{}' exceeds maximum length of {} bytes",
                value, MAX_TAG_LEN
            )));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(FlowError::invalid_config(format!(
                "tag '{}' contains invalid characters (expected ASCII alphanumeric, '_' or '-')",
                value
            )));
        }
        Ok(Self(value))
    }

    /// The reserved `start` tag.
    pub fn start() -> Self {
        Self(START_TAG.to_string())
    }

    /// The reserved `end` sink tag.
    pub fn end() -> Self {
        Self(END_TAG.to_string())
    }

    /// Returns true when this is the reserved `start` tag.
    pub fn is_start(&self) -> bool {
        self.0 == START_TAG
    }

    /// Returns true when this is the reserved `end` sink tag.
    pub fn is_end(&self) -> bool {
        self.0 == END_TAG
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Tag::new(value).map_err(serde::de::Error::custom)
    }
}
