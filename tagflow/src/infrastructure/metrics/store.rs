// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Store
//!
//! Thread-safe in-memory registry of per-stage metrics, per-line traces,
//! and errors - the single piece of state shared between the routing
//! engine, the file-queue daemon, and the HTTP dashboard.
//!
//! ## Concurrency discipline
//!
//! - Every public operation takes one exclusive lock.
//! - Read projections copy state under the lock and return the copy;
//!   callers never observe a reference into the store.
//! - Ring buffers drop the oldest element on overflow, so memory stays
//!   bounded no matter how long the process runs.
//!
//! ## Tracing lifecycle
//!
//! `start_trace` opens an in-flight builder and hands back its id (or
//! `None` when tracing is disabled - every later call accepts that and
//! no-ops). `add_trace_step` appends to the builder as the line traverses
//! stages; `complete_trace` seals it into the bounded trace ring when a
//! copy of the line reaches `end`. In-flight builders whose lines never
//! reach `end` are evicted oldest-first once the in-flight map hits the
//! trace capacity.
//!
//! ## Prometheus mirror
//!
//! When constructed with a [`MetricsService`], stage invocations, errors,
//! emitted lines, and processed files are forwarded to Prometheus counters
//! so the same activity is scrapeable at `/metrics`.

use std::backtrace::Backtrace;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use tagflow_domain::time::now_epoch_secs;
use tagflow_domain::{ErrorRecord, StageMetrics, Trace, TraceBuilder, TraceId};

use crate::infrastructure::metrics::service::MetricsService;

/// Capacity limits for the store's bounded rings.
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub max_traces: usize,
    pub max_errors: usize,
    pub max_recent_files: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_traces: 1000,
            max_errors: 100,
            max_recent_files: 200,
        }
    }
}

/// A successfully processed file, as remembered by watch mode.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFile {
    pub filename: String,
    pub timestamp: f64,
}

/// Memory and occupancy snapshot reported by `/stats` and `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    pub current_memory_mb: f64,
    pub start_memory_mb: f64,
    pub memory_growth_mb: f64,
    pub active_traces: usize,
    pub stored_traces: usize,
    pub stored_errors: usize,
}

/// Current-file plus recently-processed projection for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct FileActivitySnapshot {
    pub current_file: Option<String>,
    pub last_processed: Vec<ProcessedFile>,
}

/// One row of the `/processors` listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorInfo {
    pub name: String,
    pub count: u64,
    pub errors: u64,
    pub avg_time: f64,
    pub total_time: f64,
    pub last_seen: Option<f64>,
    pub status: &'static str,
}

struct StoreState {
    stages: HashMap<String, StageMetrics>,
    traces: VecDeque<Trace>,
    errors: VecDeque<ErrorRecord>,
    active: HashMap<TraceId, TraceBuilder>,
    active_order: VecDeque<TraceId>,
    current_file: Option<String>,
    recent_files: VecDeque<ProcessedFile>,
}

/// Thread-safe observability store. Cheap to share via `Arc`; all methods
/// take `&self`.
pub struct MetricsStore {
    limits: StoreLimits,
    trace_enabled: AtomicBool,
    start_memory_mb: f64,
    prometheus: Option<Arc<MetricsService>>,
    inner: Mutex<StoreState>,
}

impl MetricsStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            limits,
            trace_enabled: AtomicBool::new(false),
            start_memory_mb: read_rss_mb().unwrap_or(0.0),
            prometheus: None,
            inner: Mutex::new(StoreState {
                stages: HashMap::new(),
                traces: VecDeque::new(),
                errors: VecDeque::new(),
                active: HashMap::new(),
                active_order: VecDeque::new(),
                current_file: None,
                recent_files: VecDeque::new(),
            }),
        }
    }

    /// Builder-style: set the initial tracing switch.
    pub fn with_trace_enabled(self, enabled: bool) -> Self {
        self.trace_enabled.store(enabled, Ordering::SeqCst);
        self
    }

    /// Builder-style: attach a Prometheus mirror.
    pub fn with_prometheus(mut self, service: Arc<MetricsService>) -> Self {
        self.prometheus = Some(service);
        self
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled.load(Ordering::SeqCst)
    }

    pub fn set_trace_enabled(&self, enabled: bool) {
        self.trace_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Creates a zeroed per-stage entry so the stage shows up in `/stats`
    /// before any traffic. Idempotent; never bumps counters.
    pub fn register_stage(&self, stage_tag: &str) {
        let mut state = self.inner.lock();
        state.stages.entry(stage_tag.to_string()).or_default();
    }

    // ------------------------------------------------------------------
    // Tracing
    // ------------------------------------------------------------------

    /// Opens a trace for a line entering the graph. Returns `None` when
    /// tracing is disabled.
    pub fn start_trace(&self, line: &str) -> Option<TraceId> {
        if !self.trace_enabled() {
            return None;
        }
        let id = TraceId::new();
        let mut state = self.inner.lock();

        // Bound the in-flight map: evict the oldest builder once capacity
        // is reached (its line never made it to `end`).
        while state.active.len() >= self.limits.max_traces {
            match state.active_order.pop_front() {
                Some(oldest) => {
                    state.active.remove(&oldest);
                }
                None => break,
            }
        }

        state.active.insert(id, TraceBuilder::new(id, line));
        state.active_order.push_back(id);
        Some(id)
    }

    /// Appends a step to an in-flight trace. No-op when tracing is
    /// disabled, the id is `None`, or the builder was evicted.
    pub fn add_trace_step(
        &self,
        trace_id: Option<TraceId>,
        processor: &str,
        input_content: &str,
        output_content: &str,
        output_tags: Vec<String>,
        processing_time: f64,
    ) {
        let Some(id) = trace_id else { return };
        if !self.trace_enabled() {
            return;
        }
        let mut state = self.inner.lock();
        if let Some(builder) = state.active.get_mut(&id) {
            builder.add_step(processor, input_content, output_content, output_tags, processing_time);
        }
    }

    /// Seals an in-flight trace and moves it into the bounded ring.
    pub fn complete_trace(&self, trace_id: Option<TraceId>, final_content: &str) {
        let Some(id) = trace_id else { return };
        if !self.trace_enabled() {
            return;
        }
        let mut state = self.inner.lock();
        if let Some(builder) = state.active.remove(&id) {
            state.active_order.retain(|queued| *queued != id);
            let trace = builder.complete(final_content);
            if state.traces.len() >= self.limits.max_traces {
                state.traces.pop_front();
            }
            state.traces.push_back(trace);
        }
    }

    // ------------------------------------------------------------------
    // Stage metrics and errors
    // ------------------------------------------------------------------

    /// Records one stage invocation.
    pub fn record_stage_metrics(&self, stage_tag: &str, elapsed_secs: f64, success: bool) {
        {
            let mut state = self.inner.lock();
            state
                .stages
                .entry(stage_tag.to_string())
                .or_default()
                .record(elapsed_secs, success);
        }
        if let Some(prom) = &self.prometheus {
            prom.record_stage_invocation(stage_tag, elapsed_secs, success);
        }
    }

    /// Appends an error to the bounded ring and bumps the stage's error
    /// counter. When `backtrace` is `None`, one is captured here.
    pub fn record_error(&self, stage_tag: &str, message: &str, backtrace: Option<String>, line: Option<&str>) {
        let stack_trace = backtrace.unwrap_or_else(|| Backtrace::force_capture().to_string());
        {
            let mut state = self.inner.lock();
            let record = ErrorRecord::new(stage_tag, message, stack_trace, line.map(str::to_string));
            if state.errors.len() >= self.limits.max_errors {
                state.errors.pop_front();
            }
            state.errors.push_back(record);
            state.stages.entry(stage_tag.to_string()).or_default().record_error();
        }
        if let Some(prom) = &self.prometheus {
            prom.record_error(stage_tag);
        }
    }

    /// Counts a line emitted at the `end` sink (Prometheus only; per-stage
    /// counters already cover the JSON surface).
    pub fn record_line_emitted(&self) {
        if let Some(prom) = &self.prometheus {
            prom.record_line_emitted();
        }
    }

    // ------------------------------------------------------------------
    // File-queue tracking (watch mode)
    // ------------------------------------------------------------------

    /// Sets (or clears) the filename currently being processed.
    pub fn set_current_file(&self, filename: Option<&str>) {
        let mut state = self.inner.lock();
        state.current_file = filename.map(str::to_string);
    }

    /// Records a file that finished processing successfully; clears the
    /// current file when it matches.
    pub fn record_processed_file(&self, filename: &str) {
        {
            let mut state = self.inner.lock();
            if state.recent_files.len() >= self.limits.max_recent_files {
                state.recent_files.pop_front();
            }
            state.recent_files.push_back(ProcessedFile {
                filename: filename.to_string(),
                timestamp: now_epoch_secs(),
            });
            if state.current_file.as_deref() == Some(filename) {
                state.current_file = None;
            }
        }
        if let Some(prom) = &self.prometheus {
            prom.record_file_processed();
        }
    }

    // ------------------------------------------------------------------
    // Read projections (snapshots)
    // ------------------------------------------------------------------

    /// Per-stage counters, keyed by stage tag.
    pub fn get_stats(&self) -> BTreeMap<String, StageMetrics> {
        let state = self.inner.lock();
        state.stages.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Recent traces, oldest first, after applying the filters:
    /// case-insensitive substring `search` over contents, `stage_filter`
    /// on the visited path, `tag_filter` on emitted tags.
    pub fn get_traces(
        &self,
        limit: usize,
        search: Option<&str>,
        stage_filter: Option<&str>,
        tag_filter: Option<&str>,
    ) -> Vec<Trace> {
        let state = self.inner.lock();
        let search_lower = search.filter(|s| !s.is_empty()).map(str::to_lowercase);
        let filtered: Vec<&Trace> = state
            .traces
            .iter()
            .filter(|t| match &search_lower {
                Some(needle) => t.matches_search(needle),
                None => true,
            })
            .filter(|t| match stage_filter.filter(|s| !s.is_empty()) {
                Some(stage) => t.visited_stage(stage),
                None => true,
            })
            .filter(|t| match tag_filter.filter(|s| !s.is_empty()) {
                Some(tag) => t.emitted_tag(tag),
                None => true,
            })
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered.into_iter().skip(skip).cloned().collect()
    }

    /// Recent errors, oldest first.
    pub fn get_errors(&self, limit: usize) -> Vec<ErrorRecord> {
        let state = self.inner.lock();
        let skip = state.errors.len().saturating_sub(limit);
        state.errors.iter().skip(skip).cloned().collect()
    }

    /// Memory usage and ring occupancy.
    pub fn get_memory(&self) -> MemorySnapshot {
        let current = read_rss_mb().unwrap_or(0.0);
        let state = self.inner.lock();
        MemorySnapshot {
            current_memory_mb: current,
            start_memory_mb: self.start_memory_mb,
            memory_growth_mb: current - self.start_memory_mb,
            active_traces: state.active.len(),
            stored_traces: state.traces.len(),
            stored_errors: state.errors.len(),
        }
    }

    /// Current file and most recently processed files, newest first.
    pub fn get_file_activity(&self, last_n: usize) -> FileActivitySnapshot {
        let state = self.inner.lock();
        let last_processed = state.recent_files.iter().rev().take(last_n).cloned().collect();
        FileActivitySnapshot {
            current_file: state.current_file.clone(),
            last_processed,
        }
    }

    /// Stage listing with an `active`/`idle` status (active = traffic seen
    /// within the last 60 seconds), sorted by name.
    pub fn get_processors(&self) -> Vec<ProcessorInfo> {
        let now = now_epoch_secs();
        let state = self.inner.lock();
        let mut processors: Vec<ProcessorInfo> = state
            .stages
            .iter()
            .map(|(name, metrics)| ProcessorInfo {
                name: name.clone(),
                count: metrics.count,
                errors: metrics.errors,
                avg_time: metrics.avg_time,
                total_time: metrics.total_time,
                last_seen: metrics.last_seen,
                status: if metrics.is_active(now) { "active" } else { "idle" },
            })
            .collect();
        processors.sort_by(|a, b| a.name.cmp(&b.name));
        processors
    }
}

/// Resident set size in MB, from `/proc/self/status`. `None` where the
/// platform does not expose it.
#[cfg(target_os = "linux")]
fn read_rss_mb() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024.0)
}

#[cfg(not(target_os = "linux"))]
fn read_rss_mb() -> Option<f64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracing_store() -> MetricsStore {
        MetricsStore::new(StoreLimits::default()).with_trace_enabled(true)
    }

    #[test]
    fn test_stage_metrics_accumulate() {
        let store = MetricsStore::new(StoreLimits::default());
        store.register_stage("upper");
        store.record_stage_metrics("upper", 0.01, true);
        store.record_stage_metrics("upper", 0.03, true);

        let stats = store.get_stats();
        let upper = &stats["upper"];
        assert_eq!(upper.count, 2);
        assert!((upper.total_time - 0.04).abs() < 1e-9);
        assert_eq!(upper.errors, 0);
    }

    #[test]
    fn test_register_stage_does_not_bump_counters() {
        let store = MetricsStore::new(StoreLimits::default());
        store.register_stage("quiet");
        store.register_stage("quiet");
        assert_eq!(store.get_stats()["quiet"].count, 0);
    }

    #[test]
    fn test_tracing_disabled_is_a_noop() {
        let store = MetricsStore::new(StoreLimits::default());
        assert!(store.start_trace("line").is_none());
        store.add_trace_step(None, "s", "in", "out", vec![], 0.0);
        store.complete_trace(None, "out");
        assert!(store.get_traces(10, None, None, None).is_empty());
    }

    #[test]
    fn test_trace_lifecycle() {
        let store = tracing_store();
        let id = store.start_trace("hello");
        assert!(id.is_some());

        store.add_trace_step(id, "start", "hello", "HELLO", vec!["end".to_string()], 0.001);
        store.complete_trace(id, "HELLO");

        let traces = store.get_traces(10, None, None, None);
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].original_content, "hello");
        assert_eq!(traces[0].final_content, "HELLO");
        assert_eq!(traces[0].path, vec!["start"]);

        // Completed traces are no longer in flight
        assert_eq!(store.get_memory().active_traces, 0);
    }

    #[test]
    fn test_trace_ring_is_bounded() {
        let store = MetricsStore::new(StoreLimits {
            max_traces: 3,
            ..StoreLimits::default()
        })
        .with_trace_enabled(true);

        for i in 0..5 {
            let id = store.start_trace(&format!("line {}", i));
            store.complete_trace(id, &format!("line {}", i));
        }

        let traces = store.get_traces(100, None, None, None);
        assert_eq!(traces.len(), 3);
        // Oldest dropped
        assert_eq!(traces[0].original_content, "line 2");
    }

    #[test]
    fn test_inflight_traces_evicted_by_capacity() {
        let store = MetricsStore::new(StoreLimits {
            max_traces: 2,
            ..StoreLimits::default()
        })
        .with_trace_enabled(true);

        let first = store.start_trace("never finishes 1");
        let _second = store.start_trace("never finishes 2");
        let _third = store.start_trace("never finishes 3");

        assert_eq!(store.get_memory().active_traces, 2);
        // The evicted builder silently ignores further steps
        store.complete_trace(first, "too late");
        assert!(store.get_traces(10, None, None, None).is_empty());
    }

    #[test]
    fn test_trace_filters() {
        let store = tracing_store();

        let a = store.start_trace("ERROR: boom");
        store.add_trace_step(a, "tagger", "ERROR: boom", "ERROR: boom", vec!["error".to_string()], 0.0);
        store.complete_trace(a, "ERROR: boom");

        let b = store.start_trace("all fine");
        store.add_trace_step(b, "tagger", "all fine", "all fine", vec!["info".to_string()], 0.0);
        store.add_trace_step(b, "info", "all fine", "all fine", vec!["end".to_string()], 0.0);
        store.complete_trace(b, "all fine");

        assert_eq!(store.get_traces(10, Some("boom"), None, None).len(), 1);
        assert_eq!(store.get_traces(10, Some("BOOM"), None, None).len(), 1);
        assert_eq!(store.get_traces(10, None, Some("info"), None).len(), 1);
        assert_eq!(store.get_traces(10, None, Some("tagger"), None).len(), 2);
        assert_eq!(store.get_traces(10, None, None, Some("error")).len(), 1);
        assert_eq!(store.get_traces(10, Some(""), None, None).len(), 2);
    }

    #[test]
    fn test_error_ring_is_bounded_and_counts() {
        let store = MetricsStore::new(StoreLimits {
            max_errors: 2,
            ..StoreLimits::default()
        });

        store.record_error("router", "first", None, None);
        store.record_error("router", "second", Some("trace".to_string()), Some("the line"));
        store.record_error("router", "third", None, None);

        let errors = store.get_errors(10);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "second");
        assert_eq!(errors[0].stack_trace, "trace");
        assert_eq!(errors[0].line_content.as_deref(), Some("the line"));

        assert_eq!(store.get_stats()["router"].errors, 3);
    }

    #[test]
    fn test_file_tracking() {
        let store = MetricsStore::new(StoreLimits::default());
        store.set_current_file(Some("a.txt"));
        let snap = store.get_file_activity(10);
        assert_eq!(snap.current_file.as_deref(), Some("a.txt"));

        store.record_processed_file("a.txt");
        let snap = store.get_file_activity(10);
        assert!(snap.current_file.is_none());
        assert_eq!(snap.last_processed.len(), 1);
        assert_eq!(snap.last_processed[0].filename, "a.txt");
    }

    #[test]
    fn test_processor_listing_status() {
        let store = MetricsStore::new(StoreLimits::default());
        store.register_stage("idle-stage");
        store.record_stage_metrics("busy-stage", 0.001, true);

        let processors = store.get_processors();
        assert_eq!(processors.len(), 2);
        // sorted by name
        assert_eq!(processors[0].name, "busy-stage");
        assert_eq!(processors[0].status, "active");
        assert_eq!(processors[1].status, "idle");
    }
}
