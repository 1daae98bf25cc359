// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Single-File Use Case
//!
//! Processes one input file through the routing graph and exits: load and
//! validate the config, build the engine, optionally start the dashboard,
//! stream the file, report the summary. Any config, routing, or stage
//! error propagates to the CLI, which exits non-zero.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use tagflow_domain::FlowError;

use crate::application::services::pipeline_driver::run_pipeline;
use crate::application::use_cases::resolve_trace;
use crate::infrastructure::config::loader::FlowConfig;
use crate::infrastructure::http::endpoint::DashboardServer;
use crate::infrastructure::metrics::service::MetricsService;
use crate::infrastructure::metrics::store::{MetricsStore, StoreLimits};
use crate::infrastructure::runtime::router::{RoutingEngine, DEFAULT_MAX_HOPS};
use crate::infrastructure::stages::registry::StageRegistry;

/// Options for `tagflow single`.
#[derive(Debug, Clone)]
pub struct SingleFileOptions {
    pub input: PathBuf,
    pub config: PathBuf,
    pub output: Option<PathBuf>,
    /// Explicit tracing switch; `None` falls back to `TRACE_ENABLED`, then
    /// off.
    pub trace: Option<bool>,
    pub dashboard: bool,
    pub dashboard_port: u16,
}

/// Runs the single-file pipeline.
pub async fn run_single(options: SingleFileOptions) -> Result<(), FlowError> {
    if !options.input.is_file() {
        return Err(FlowError::io_error(format!(
            "input file '{}' does not exist",
            options.input.display()
        )));
    }

    let registry = StageRegistry::with_builtins();
    let config = FlowConfig::from_path(&options.config, &registry)?;

    let trace_enabled = resolve_trace(options.trace, false);
    let metrics = Arc::new(MetricsService::new()?);
    let store = Arc::new(
        MetricsStore::new(StoreLimits::default())
            .with_trace_enabled(trace_enabled)
            .with_prometheus(metrics.clone()),
    );

    if options.dashboard {
        let addr = format!("127.0.0.1:{}", options.dashboard_port);
        let server = DashboardServer::bind(&addr, store.clone(), Some(metrics.clone()), None).await?;
        tokio::spawn(async move {
            // The dashboard is a daemon task; it dies with the process.
            let _ = server.serve().await;
        });
    }

    info!("Processing single file: {}", options.input.display());
    let mut engine = RoutingEngine::from_config(&config, &registry, store, DEFAULT_MAX_HOPS)?;

    let input = options.input.clone();
    let output = options.output.clone();
    let summary = tokio::task::spawn_blocking(move || run_pipeline(&mut engine, &input, output.as_deref()))
        .await
        .map_err(|e| FlowError::internal_error(format!("pipeline task failed: {}", e)))??;

    info!(
        "Processed {} line(s) in, {} line(s) out in {:.3}s",
        summary.lines_in,
        summary.lines_out,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
