// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Prometheus Metrics Service
//!
//! Mirrors the activity recorded in the metrics store into a Prometheus
//! registry so monitoring systems can scrape the same counters at
//! `GET /metrics`. The JSON observability surface remains the source of
//! truth for the dashboard; this service exists for fleet-level scraping.
//!
//! All metrics live under the `tagflow` namespace:
//!
//! - `tagflow_lines_emitted_total` - lines that reached the `end` sink
//! - `tagflow_stage_invocations_total{stage}` - stage calls
//! - `tagflow_stage_errors_total{stage}` - errors attributed to a stage
//! - `tagflow_stage_duration_seconds{stage}` - stage call latency
//! - `tagflow_files_processed_total` - watch-mode files committed

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use tagflow_domain::FlowError;

const NAMESPACE: &str = "tagflow";

/// Prometheus mirror of the routing engine's activity.
pub struct MetricsService {
    registry: Registry,
    lines_emitted_total: IntCounter,
    stage_invocations_total: IntCounterVec,
    stage_errors_total: IntCounterVec,
    stage_duration_seconds: HistogramVec,
    files_processed_total: IntCounter,
}

impl MetricsService {
    pub fn new() -> Result<Self, FlowError> {
        let registry = Registry::new();

        let lines_emitted_total = IntCounter::with_opts(
            Opts::new("lines_emitted_total", "Lines that reached the end sink").namespace(NAMESPACE),
        )
        .map_err(|e| FlowError::metrics_error(format!("failed to create counter: {}", e)))?;

        let stage_invocations_total = IntCounterVec::new(
            Opts::new("stage_invocations_total", "Stage invocations by stage tag").namespace(NAMESPACE),
            &["stage"],
        )
        .map_err(|e| FlowError::metrics_error(format!("failed to create counter: {}", e)))?;

        let stage_errors_total = IntCounterVec::new(
            Opts::new("stage_errors_total", "Errors attributed to a stage").namespace(NAMESPACE),
            &["stage"],
        )
        .map_err(|e| FlowError::metrics_error(format!("failed to create counter: {}", e)))?;

        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new("stage_duration_seconds", "Stage call latency in seconds").namespace(NAMESPACE),
            &["stage"],
        )
        .map_err(|e| FlowError::metrics_error(format!("failed to create histogram: {}", e)))?;

        let files_processed_total = IntCounter::with_opts(
            Opts::new("files_processed_total", "Watch-mode files processed successfully").namespace(NAMESPACE),
        )
        .map_err(|e| FlowError::metrics_error(format!("failed to create counter: {}", e)))?;

        for collector in [
            Box::new(lines_emitted_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(stage_invocations_total.clone()),
            Box::new(stage_errors_total.clone()),
            Box::new(stage_duration_seconds.clone()),
            Box::new(files_processed_total.clone()),
        ] {
            registry
                .register(collector)
                .map_err(|e| FlowError::metrics_error(format!("failed to register collector: {}", e)))?;
        }

        Ok(Self {
            registry,
            lines_emitted_total,
            stage_invocations_total,
            stage_errors_total,
            stage_duration_seconds,
            files_processed_total,
        })
    }

    /// Records one stage call with its wall-clock duration.
    pub fn record_stage_invocation(&self, stage: &str, elapsed_secs: f64, success: bool) {
        self.stage_invocations_total.with_label_values(&[stage]).inc();
        self.stage_duration_seconds
            .with_label_values(&[stage])
            .observe(elapsed_secs);
        if !success {
            self.stage_errors_total.with_label_values(&[stage]).inc();
        }
    }

    /// Records an error attributed to a stage outside a timed invocation.
    pub fn record_error(&self, stage: &str) {
        self.stage_errors_total.with_label_values(&[stage]).inc();
    }

    /// Counts a line emitted at the `end` sink.
    pub fn record_line_emitted(&self) {
        self.lines_emitted_total.inc();
    }

    /// Counts a watch-mode file committed to `processed/`.
    pub fn record_file_processed(&self) {
        self.files_processed_total.inc();
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn get_metrics(&self) -> Result<String, FlowError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .map_err(|e| FlowError::metrics_error(format!("failed to encode metrics: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_renders_registered_metrics() {
        let service = MetricsService::new().unwrap();
        service.record_line_emitted();
        service.record_stage_invocation("upper", 0.001, true);
        service.record_file_processed();

        let output = service.get_metrics().unwrap();
        assert!(output.contains("tagflow_lines_emitted_total"));
        assert!(output.contains("tagflow_stage_invocations_total"));
        assert!(output.contains("tagflow_files_processed_total"));
    }

    #[test]
    fn test_failed_invocation_counts_as_stage_error() {
        let service = MetricsService::new().unwrap();
        service.record_stage_invocation("bad", 0.002, false);
        let output = service.get_metrics().unwrap();
        assert!(output.contains("tagflow_stage_errors_total"));
    }
}
