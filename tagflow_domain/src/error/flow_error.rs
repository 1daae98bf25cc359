// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error type shared across the tagflow system. It
//! categorizes failures by where they arise (configuration, routing, stage
//! execution, I/O, observability) so that callers can decide between
//! terminating the process, aborting the current file, or retrying.
//!
//! ## Error Taxonomy
//!
//! - **Configuration errors** (`InvalidConfiguration`) - missing `start`
//!   node, duplicate tags, unresolved stage identifiers, bad route targets.
//!   These fail before the engine starts.
//! - **Routing errors** (`UnknownTag`, `HopLimitExceeded`,
//!   `InvalidEmission`) - fatal for the current file, recorded against the
//!   `router` stage tag.
//! - **Stage errors** (`StageFailed`) - a stage returned an error while
//!   processing a line. Fatal for the current file, recorded against the
//!   failing stage's tag.
//! - **I/O errors** (`IoError`) - read/write/move failures. Fatal for the
//!   current file or job; the file-queue daemon records them and moves on.
//! - **System errors** (`SerializationError`, `MetricsError`,
//!   `InternalError`, `Cancelled`) - everything else.
//!
//! ## Error Handling Strategy
//!
//! Errors carry human-readable messages rather than structured payloads;
//! the offending stage tag and the triggering line are folded into the
//! message at the point of failure, where both are in scope.

use thiserror::Error;

/// Domain-specific errors for the tagflow line-routing system.
///
/// Each variant includes a descriptive message designed to name the
/// offending stage tag and, where useful, the triggering line (truncated by
/// the caller if long).
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Hop limit exceeded: {0}")]
    HopLimitExceeded(String),

    #[error("Invalid emission: {0}")]
    InvalidEmission(String),

    #[error("Stage failed: {0}")]
    StageFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl FlowError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new unknown-tag routing error
    pub fn unknown_tag(msg: impl Into<String>) -> Self {
        Self::UnknownTag(msg.into())
    }

    /// Creates a new hop-limit routing error
    pub fn hop_limit(msg: impl Into<String>) -> Self {
        Self::HopLimitExceeded(msg.into())
    }

    /// Creates a new invalid-emission routing error
    pub fn invalid_emission(msg: impl Into<String>) -> Self {
        Self::InvalidEmission(msg.into())
    }

    /// Creates a new stage execution error
    pub fn stage_failed(msg: impl Into<String>) -> Self {
        Self::StageFailed(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Creates a new metrics error
    pub fn metrics_error(msg: impl Into<String>) -> Self {
        Self::MetricsError(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error is recoverable by retrying the same work
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FlowError::IoError(_))
    }

    /// Checks if the error was raised by the routing engine itself rather
    /// than by a stage
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            FlowError::UnknownTag(_) | FlowError::HopLimitExceeded(_) | FlowError::InvalidEmission(_)
        )
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            FlowError::InvalidConfiguration(_) => "configuration",
            FlowError::UnknownTag(_) => "routing",
            FlowError::HopLimitExceeded(_) => "routing",
            FlowError::InvalidEmission(_) => "routing",
            FlowError::StageFailed(_) => "stage",
            FlowError::IoError(_) => "io",
            FlowError::SerializationError(_) => "serialization",
            FlowError::MetricsError(_) => "metrics",
            FlowError::Cancelled(_) => "cancellation",
            FlowError::InternalError(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        FlowError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::SerializationError(err.to_string())
    }
}

// NOTE: YAML error conversion lives in the infrastructure layer - the config
// document format is an infrastructure concern.
