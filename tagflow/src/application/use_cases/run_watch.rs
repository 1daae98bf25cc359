// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Watch Use Case
//!
//! Wires watch mode together: validates the config up front, starts the
//! dashboard, installs ctrl-c handling through the shutdown coordinator,
//! and runs the file-queue daemon on a blocking worker until cancellation.
//! The daemon finishes the file in flight before exiting; anything left in
//! `underprocess/` after a hard kill is recovered on the next startup.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use tagflow_bootstrap::shutdown::ShutdownCoordinator;
use tagflow_domain::FlowError;

use crate::application::use_cases::resolve_trace;
use crate::infrastructure::config::loader::FlowConfig;
use crate::infrastructure::http::endpoint::DashboardServer;
use crate::infrastructure::metrics::service::MetricsService;
use crate::infrastructure::metrics::store::{MetricsStore, StoreLimits};
use crate::infrastructure::stages::registry::StageRegistry;
use crate::infrastructure::watch::daemon::{DaemonOptions, FileQueueDaemon};
use crate::infrastructure::watch::layout::QueueLayout;

/// Options for `tagflow watch`.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub watch_dir: PathBuf,
    pub config: PathBuf,
    /// Explicit tracing switch; `None` falls back to `TRACE_ENABLED`, then
    /// on (watch mode traces by default).
    pub trace: Option<bool>,
    pub dashboard: bool,
    pub dashboard_port: u16,
    pub max_traces: usize,
    pub max_errors: usize,
}

/// Runs watch mode until ctrl-c.
pub async fn run_watch(options: WatchOptions) -> Result<(), FlowError> {
    let registry = StageRegistry::with_builtins();
    let config = FlowConfig::from_path(&options.config, &registry)?;

    let trace_enabled = resolve_trace(options.trace, true);
    let metrics = Arc::new(MetricsService::new()?);
    let store = Arc::new(
        MetricsStore::new(StoreLimits {
            max_traces: options.max_traces,
            max_errors: options.max_errors,
            ..StoreLimits::default()
        })
        .with_trace_enabled(trace_enabled)
        .with_prometheus(metrics.clone()),
    );

    let layout = QueueLayout::new(&options.watch_dir);
    layout.ensure()?;

    if options.dashboard {
        let addr = format!("127.0.0.1:{}", options.dashboard_port);
        let server =
            DashboardServer::bind(&addr, store.clone(), Some(metrics.clone()), Some(layout.clone())).await?;
        tokio::spawn(async move {
            let _ = server.serve().await;
        });
    }

    let coordinator = ShutdownCoordinator::default();
    {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested, stopping monitor...");
                    coordinator.initiate_shutdown();
                }
                Err(e) => warn!("Failed to listen for ctrl-c: {}", e),
            }
        });
    }

    info!("Drop files into {}/unprocessed to process them", options.watch_dir.display());

    let daemon = FileQueueDaemon::new(
        config,
        registry,
        store,
        layout,
        coordinator.token(),
        DaemonOptions::default(),
    );
    let result = tokio::task::spawn_blocking(move || daemon.run())
        .await
        .map_err(|e| FlowError::internal_error(format!("daemon task failed: {}", e)))?;

    coordinator.complete_shutdown();
    info!("Stopped.");
    result
}
