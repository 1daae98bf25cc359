// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tagflow Domain Layer
//!
//! Pure domain model for the tagflow line-routing engine. This crate holds
//! the vocabulary every other layer speaks: tags, routing envelopes, traces,
//! stage metrics, and the processor contract.
//!
//! ## Overview
//!
//! Tagflow moves text lines through a user-defined graph of named stages.
//! Each stage consumes one line and emits zero or more `(tag-list, line)`
//! pairs; the tags decide where each copy of the line travels next, until a
//! copy reaches the reserved sink tag `end` and is written to output.
//!
//! The domain layer defines:
//!
//! - [`Tag`] - validated stage identifier, with the reserved `start`/`end` tags
//! - [`Envelope`] - the engine's unit of work `(tag, line, hops, trace id)`
//! - [`Processor`] - the single-method contract every stage implements
//! - [`Emission`] - one `(tag-list, line)` pair produced by a stage
//! - [`Trace`] / [`TraceStep`] - the recorded journey of one input line
//! - [`StageMetrics`] - per-stage counters (invocations, timing, errors)
//! - [`FlowError`] - the error type shared across all layers
//!
//! ## Design Principles
//!
//! - **No runtime concerns**: no tokio, no tracing, no I/O. Infrastructure
//!   layers own those.
//! - **Single-writer stages**: a processor's state is mutated only by the
//!   engine thread that calls it, so the contract takes `&mut self`.
//! - **Explicit errors**: every fallible operation returns
//!   `Result<_, FlowError>`; stages never panic to signal failure.

pub mod entities;
pub mod error;
pub mod services;
pub mod time;
pub mod value_objects;

// Re-export commonly used types at the crate root
pub use entities::error_record::ErrorRecord;
pub use entities::stage_metrics::StageMetrics;
pub use entities::trace::{Trace, TraceBuilder, TraceStep};
pub use error::FlowError;
pub use services::processor::{Emission, FnStage, Processor};
pub use value_objects::envelope::Envelope;
pub use value_objects::tag::Tag;
pub use value_objects::trace_id::TraceId;
