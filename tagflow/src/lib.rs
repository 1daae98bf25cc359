// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tagflow
//!
//! A line-oriented stream-processing framework. Text lines enter at the
//! reserved `start` stage, travel through a user-defined directed graph of
//! named stages routed by the tags each stage emits, and leave through the
//! reserved `end` sink.
//!
//! ## Architecture
//!
//! The crate follows the layered layout used across the workspace:
//!
//! - **Application layer** - use cases (`single`, `watch`, `validate`) and
//!   the pipeline driver that streams a file through the engine
//! - **Infrastructure layer** - config loading, the stage registry and
//!   built-in stages, the metrics store and its Prometheus mirror, the
//!   routing engine, the file-queue daemon, and the HTTP dashboard
//! - **Presentation layer** - the clap command-line interface
//!
//! Domain types (tags, envelopes, traces, the processor contract) live in
//! `tagflow-domain`; process lifecycle (shutdown, exit codes) lives in
//! `tagflow-bootstrap`.
//!
//! ## Execution model
//!
//! The routing engine is single-threaded within one file. In watch mode the
//! file-queue daemon serializes files on its own worker; the dashboard
//! serves requests on independent tokio tasks. The metrics store is the
//! only state shared across those contexts, guarded by one exclusive lock.

pub mod application;
pub mod infrastructure;
pub mod presentation;

// Re-export the domain vocabulary for convenience
pub use tagflow_domain::{Emission, Envelope, FlowError, FnStage, Processor, Tag, TraceId};

pub use crate::application::services::pipeline_driver::{run_pipeline, OutputSink};
pub use crate::infrastructure::config::loader::FlowConfig;
pub use crate::infrastructure::metrics::store::{MetricsStore, StoreLimits};
pub use crate::infrastructure::runtime::router::{RoutingEngine, RunSummary, DEFAULT_MAX_HOPS};
pub use crate::infrastructure::stages::registry::StageRegistry;
