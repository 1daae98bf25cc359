// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Routing Engine
//!
//! Drives lines through the routing graph. The engine maintains a FIFO work
//! queue of [`Envelope`]s and dispatches them one at a time:
//!
//! 1. An envelope tagged `end` is emitted to the output sink (finalizing
//!    its trace, if any).
//! 2. An envelope whose hop count exceeds the bound is a fatal `router`
//!    error - the loop guard against runaway routing cycles.
//! 3. An envelope tagged with an unknown tag is a fatal `router` error.
//! 4. Otherwise the stage bound to the tag is invoked with the line. Every
//!    emission is validated (non-empty tag list, all tags known or `end`)
//!    and enqueued at the tail, one envelope per tag, preserving emission
//!    order. Fan-out copies inherit the parent's trace id.
//!
//! ## Ordering
//!
//! The engine is single-threaded within one run and the queue is FIFO, so
//! siblings produced by fan-out interleave breadth-first. The queue refills
//! from the (lazy) line source only when empty, which keeps memory bounded
//! by one line's in-flight work; no ordering is promised across input lines
//! once a stage fans out.
//!
//! ## Failure semantics
//!
//! Stage errors and routing violations abort the current run: the error is
//! recorded in the metrics store (under the stage's tag, or `router` for
//! dispatch-level violations) and returned to the caller. In single-file
//! mode that terminates the process; the file-queue daemon catches it and
//! requeues the file.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use tagflow_domain::entities::node::RoutingNode;
use tagflow_domain::value_objects::tag::END_TAG;
use tagflow_domain::{Envelope, FlowError, Tag};

use crate::infrastructure::config::loader::FlowConfig;
use crate::infrastructure::metrics::store::MetricsStore;
use crate::infrastructure::stages::registry::StageRegistry;

/// Default bound on dispatch steps per line.
pub const DEFAULT_MAX_HOPS: u32 = 1000;

/// Stage tag under which dispatch-level errors are recorded.
const ROUTER_TAG: &str = "router";

/// Longest line prefix included in error messages.
const ERROR_LINE_PREVIEW: usize = 120;

/// Totals for one engine run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Input lines consumed from the source.
    pub lines_in: u64,
    /// Lines emitted at the `end` sink.
    pub lines_out: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// The tag-routed dispatch engine. Single-threaded within one run; build a
/// fresh engine per file to give stateful stages a clean slate.
pub struct RoutingEngine {
    start: Tag,
    nodes: HashMap<Tag, RoutingNode>,
    max_hops: u32,
    store: Arc<MetricsStore>,
}

impl RoutingEngine {
    /// Builds an engine from a validated config, instantiating one fresh
    /// stage per node entry and registering each stage with the store.
    pub fn from_config(
        config: &FlowConfig,
        registry: &StageRegistry,
        store: Arc<MetricsStore>,
        max_hops: u32,
    ) -> Result<Self, FlowError> {
        let mut nodes = HashMap::new();
        for spec in config.nodes() {
            let processor = registry.resolve(spec.stage_type())?;
            store.register_stage(spec.tag().as_str());
            nodes.insert(
                spec.tag().clone(),
                RoutingNode::new(spec.tag().clone(), processor, spec.routes().to_vec()),
            );
        }
        Ok(Self {
            start: config.start().clone(),
            nodes,
            max_hops,
            store,
        })
    }

    /// Routes every line from `lines` through the graph, calling `emit` for
    /// each envelope that reaches `end`.
    ///
    /// The source is consumed lazily: each input line is seeded onto the
    /// queue only after the previous line's work has drained.
    pub fn run<I, F>(&mut self, lines: I, mut emit: F) -> Result<RunSummary, FlowError>
    where
        I: IntoIterator<Item = Result<String, FlowError>>,
        F: FnMut(&str) -> Result<(), FlowError>,
    {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        let mut source = lines.into_iter();
        let mut queue: VecDeque<Envelope> = VecDeque::new();

        loop {
            let mut envelope = match queue.pop_front() {
                Some(envelope) => envelope,
                None => match source.next() {
                    Some(line) => {
                        summary.lines_in += 1;
                        Envelope::seed(self.start.clone(), line?)
                    }
                    None => break,
                },
            };

            // 1. Sink: emit and finalize the trace.
            if envelope.tag.is_end() {
                if envelope.trace_id.is_some() {
                    self.store.add_trace_step(
                        envelope.trace_id,
                        END_TAG,
                        &envelope.line,
                        &envelope.line,
                        vec![END_TAG.to_string()],
                        0.0,
                    );
                    self.store.complete_trace(envelope.trace_id, &envelope.line);
                }
                emit(&envelope.line)?;
                self.store.record_line_emitted();
                summary.lines_out += 1;
                continue;
            }

            // 2. Loop guard.
            if envelope.hops > self.max_hops {
                let message = format!(
                    "line exceeded max hops ({}) at tag '{}'; possible routing loop (line: {})",
                    self.max_hops,
                    envelope.tag,
                    preview(&envelope.line)
                );
                self.store.record_error(ROUTER_TAG, &message, None, Some(&envelope.line));
                return Err(FlowError::hop_limit(message));
            }

            // 3. Unknown tag at dispatch.
            let Some(node) = self.nodes.get_mut(&envelope.tag) else {
                let message = format!(
                    "line routed to unknown tag '{}'; check stage output or config (line: {})",
                    envelope.tag,
                    preview(&envelope.line)
                );
                self.store.record_error(ROUTER_TAG, &message, None, Some(&envelope.line));
                return Err(FlowError::unknown_tag(message));
            };

            // 4. Open a trace on first contact with a stage.
            if envelope.trace_id.is_none() {
                envelope.trace_id = self.store.start_trace(&envelope.line);
            }

            // 5. Invoke the stage and time it.
            let stage_tag = envelope.tag.clone();
            let stage_started = Instant::now();
            let result = node.processor_mut().process(&envelope.line);
            let elapsed = stage_started.elapsed().as_secs_f64();

            let emissions = match result {
                Ok(emissions) => {
                    self.store.record_stage_metrics(stage_tag.as_str(), elapsed, true);
                    emissions
                }
                Err(err) => {
                    self.store.record_stage_metrics(stage_tag.as_str(), elapsed, false);
                    let message = format!(
                        "stage '{}' failed: {} (line: {})",
                        stage_tag,
                        err,
                        preview(&envelope.line)
                    );
                    self.store
                        .record_error(stage_tag.as_str(), &message, None, Some(&envelope.line));
                    return Err(FlowError::stage_failed(message));
                }
            };

            if emissions.is_empty() {
                // A stage may drop a line: no output, no trace completion.
                debug!("stage '{}' dropped line: {}", stage_tag, preview(&envelope.line));
                continue;
            }

            // 6. Validate emissions and enqueue fan-out copies in order.
            for emission in emissions {
                if emission.tags.is_empty() {
                    let message = format!(
                        "stage '{}' emitted an empty tag list; every emission must carry at least one tag",
                        stage_tag
                    );
                    self.store
                        .record_error(stage_tag.as_str(), &message, None, Some(&envelope.line));
                    return Err(FlowError::invalid_emission(message));
                }
                for tag in &emission.tags {
                    if !tag.is_end() && !self.nodes.contains_key(tag) {
                        let message = format!(
                            "stage '{}' emitted unknown tag '{}'; add it to the config",
                            stage_tag, tag
                        );
                        self.store
                            .record_error(stage_tag.as_str(), &message, None, Some(&envelope.line));
                        return Err(FlowError::invalid_emission(message));
                    }
                }

                self.store.add_trace_step(
                    envelope.trace_id,
                    stage_tag.as_str(),
                    &envelope.line,
                    &emission.line,
                    emission.tags.iter().map(|t| t.as_str().to_string()).collect(),
                    elapsed,
                );

                for tag in emission.tags {
                    queue.push_back(envelope.follow(tag, emission.line.clone()));
                }
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            "Routing completed: {} lines in, {} lines out in {:.2}s",
            summary.lines_in,
            summary.lines_out,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}

/// Truncates a line for inclusion in an error message, respecting char
/// boundaries.
fn preview(line: &str) -> String {
    if line.len() <= ERROR_LINE_PREVIEW {
        return line.to_string();
    }
    let mut cut = ERROR_LINE_PREVIEW;
    while !line.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &line[..cut])
}
