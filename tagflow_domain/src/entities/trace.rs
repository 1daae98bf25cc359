// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Line Traces
//!
//! A [`Trace`] is the ordered record of one input line's journey through the
//! routing graph: the original and final content, every stage step taken
//! (with per-step input, output, emitted tags, and timing), the sequence of
//! stages visited, and the set of tags generated along the way.
//!
//! Traces are built incrementally: the engine opens a [`TraceBuilder`] when
//! a line enters the graph, appends a step per stage emission, and completes
//! the builder into an immutable [`Trace`] when a copy of the line reaches
//! the `end` sink. Lines that never reach `end` leave their builder
//! in-flight until the store evicts it by capacity.

use serde::Serialize;

use crate::time::now_epoch_secs;
use crate::value_objects::trace_id::TraceId;

/// A single step in a line's journey through one stage.
#[derive(Debug, Clone, Serialize)]
pub struct TraceStep {
    /// Tag of the stage that performed this step.
    pub processor: String,
    /// Line content handed to the stage.
    pub input_content: String,
    /// Line content the stage emitted.
    pub output_content: String,
    /// Tags the stage attached to the emitted line.
    pub output_tags: Vec<String>,
    /// Seconds since epoch at which the step was recorded.
    pub timestamp: f64,
    /// Wall-clock seconds spent in the stage call.
    pub processing_time: f64,
}

/// The completed record of one line's traversal.
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    pub line_id: TraceId,
    pub original_content: String,
    pub final_content: String,
    pub steps: Vec<TraceStep>,
    /// Sequence of stage tags visited.
    pub path: Vec<String>,
    /// All output tags generated during the journey, deduplicated in first-seen order.
    pub all_tags: Vec<String>,
    pub start_timestamp: f64,
    pub end_timestamp: f64,
    pub total_time: f64,
}

impl Trace {
    /// Case-insensitive substring search across original/final content and
    /// every step's input and output.
    pub fn matches_search(&self, needle_lower: &str) -> bool {
        self.original_content.to_lowercase().contains(needle_lower)
            || self.final_content.to_lowercase().contains(needle_lower)
            || self.steps.iter().any(|s| {
                s.input_content.to_lowercase().contains(needle_lower)
                    || s.output_content.to_lowercase().contains(needle_lower)
            })
    }

    /// True when the given stage appears anywhere in the trace's path.
    pub fn visited_stage(&self, stage: &str) -> bool {
        self.path.iter().any(|p| p == stage)
    }

    /// True when the given tag was emitted at any step.
    pub fn emitted_tag(&self, tag: &str) -> bool {
        self.all_tags.iter().any(|t| t == tag)
    }
}

/// Accumulates the steps of an in-flight trace.
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    line_id: TraceId,
    original_content: String,
    steps: Vec<TraceStep>,
    path: Vec<String>,
    all_tags: Vec<String>,
    start_timestamp: f64,
}

impl TraceBuilder {
    /// Opens a trace for a line entering the graph.
    pub fn new(line_id: TraceId, original_content: impl Into<String>) -> Self {
        Self {
            line_id,
            original_content: original_content.into(),
            steps: Vec::new(),
            path: Vec::new(),
            all_tags: Vec::new(),
            start_timestamp: now_epoch_secs(),
        }
    }

    /// The id this builder was opened under.
    pub fn line_id(&self) -> TraceId {
        self.line_id
    }

    /// Appends one stage step.
    pub fn add_step(
        &mut self,
        processor: &str,
        input_content: &str,
        output_content: &str,
        output_tags: Vec<String>,
        processing_time: f64,
    ) {
        self.path.push(processor.to_string());
        self.all_tags.extend(output_tags.iter().cloned());
        self.steps.push(TraceStep {
            processor: processor.to_string(),
            input_content: input_content.to_string(),
            output_content: output_content.to_string(),
            output_tags,
            timestamp: now_epoch_secs(),
            processing_time,
        });
    }

    /// Seals the builder into an immutable trace.
    pub fn complete(self, final_content: impl Into<String>) -> Trace {
        let end_timestamp = now_epoch_secs();

        // Deduplicate tags preserving first-seen order
        let mut all_tags = Vec::new();
        for tag in self.all_tags {
            if !all_tags.contains(&tag) {
                all_tags.push(tag);
            }
        }

        Trace {
            line_id: self.line_id,
            original_content: self.original_content,
            final_content: final_content.into(),
            steps: self.steps,
            path: self.path,
            all_tags,
            start_timestamp: self.start_timestamp,
            end_timestamp,
            total_time: end_timestamp - self.start_timestamp,
        }
    }
}
