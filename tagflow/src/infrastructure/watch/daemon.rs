// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File-Queue Daemon
//!
//! Continuously drains `unprocessed/`, one file at a time:
//!
//! 1. **Claim** - atomic rename into `underprocess/`. A failed rename
//!    (concurrent claim, permissions) just skips the candidate.
//! 2. **Process** - a fresh engine is built from the validated config and
//!    run over the file's lines; output goes to `processed/<name>.out`.
//! 3. **Commit** - rename into `processed/<name>` (suffix `.dup` when the
//!    name is already taken).
//! 4. **Retry** - any processing error is recorded and the file renamed
//!    back to `unprocessed/<name>` (suffix `.retry` on collision).
//!
//! Candidates are taken oldest-mtime-first. The cancellation token is
//! observed between files only - a file in flight is always finished - and
//! a short pause separates files so a directory of fast-failing inputs
//! cannot spin the loop hot.
//!
//! The daemon body is synchronous; the watch use case runs it on a
//! blocking task so the dashboard stays responsive beside it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use tagflow_bootstrap::shutdown::CancellationToken;
use tagflow_domain::FlowError;

use crate::application::services::pipeline_driver::run_pipeline;
use crate::infrastructure::config::loader::FlowConfig;
use crate::infrastructure::metrics::store::MetricsStore;
use crate::infrastructure::runtime::router::RoutingEngine;
use crate::infrastructure::stages::registry::StageRegistry;
use crate::infrastructure::watch::layout::{list_files, QueueLayout};

/// Stage tag for per-file processing failures.
const FILE_PROCESSOR_TAG: &str = "file_processor";

/// Stage tag for scan-loop failures.
const MONITOR_TAG: &str = "monitor";

/// Tunables for the daemon loop.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// How often to poll `unprocessed/` when it is empty.
    pub poll_interval: Duration,
    /// Pause between files, so fast-failing inputs cannot spin the loop.
    pub pause_between_files: Duration,
    /// Hop bound handed to each per-file engine.
    pub max_hops: u32,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            pause_between_files: Duration::from_millis(10),
            max_hops: crate::infrastructure::runtime::router::DEFAULT_MAX_HOPS,
        }
    }
}

/// The watch-mode worker. Owns the validated config and registry; builds a
/// fresh engine per file so stateful stages start clean each time.
pub struct FileQueueDaemon {
    config: FlowConfig,
    registry: StageRegistry,
    store: Arc<MetricsStore>,
    layout: QueueLayout,
    token: CancellationToken,
    options: DaemonOptions,
}

impl FileQueueDaemon {
    pub fn new(
        config: FlowConfig,
        registry: StageRegistry,
        store: Arc<MetricsStore>,
        layout: QueueLayout,
        token: CancellationToken,
        options: DaemonOptions,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            layout,
            token,
            options,
        }
    }

    /// Runs until the cancellation token fires. Never aborts on per-file
    /// errors; only an unusable queue layout is fatal.
    pub fn run(self) -> Result<(), FlowError> {
        self.layout.ensure()?;
        let recovered = self.layout.recover()?;
        if recovered > 0 {
            info!("Recovered {} in-progress file(s) on startup", recovered);
        }
        info!("Monitoring directory: {} for new files...", self.layout.unprocessed().display());

        while !self.token.is_cancelled() {
            match self.scan_candidates() {
                Ok(candidates) if candidates.is_empty() => {
                    self.sleep_observing_cancellation(self.options.poll_interval);
                }
                Ok(candidates) => {
                    for candidate in candidates {
                        if self.token.is_cancelled() {
                            break;
                        }
                        self.handle_candidate(&candidate);
                        std::thread::sleep(self.options.pause_between_files);
                    }
                }
                Err(err) => {
                    self.store.record_error(MONITOR_TAG, &err.to_string(), None, None);
                    warn!("Monitor loop error: {}", err);
                    self.sleep_observing_cancellation(Duration::from_secs(1));
                }
            }
        }

        info!("File monitor stopping");
        Ok(())
    }

    /// Candidate files in `unprocessed/`, oldest mtime first.
    fn scan_candidates(&self) -> Result<Vec<PathBuf>, FlowError> {
        let mut with_mtime: Vec<(SystemTime, PathBuf)> = Vec::new();
        for path in list_files(self.layout.unprocessed())? {
            let mtime = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            with_mtime.push((mtime, path));
        }
        with_mtime.sort();
        Ok(with_mtime.into_iter().map(|(_, path)| path).collect())
    }

    /// Claims, processes, and commits (or requeues) one candidate. Errors
    /// are recorded, never propagated: the daemon moves on to the next
    /// file.
    fn handle_candidate(&self, candidate: &Path) {
        let Some(name) = candidate.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return;
        };

        // Claim: a failed rename means someone else got there first.
        let claimed = self.layout.underprocess().join(&name);
        if let Err(e) = std::fs::rename(candidate, &claimed) {
            debug!("Failed to claim file {}: {}", name, e);
            return;
        }

        self.store.set_current_file(Some(&name));
        info!("Processing file: {}", name);

        let out_path = self.layout.processed().join(format!("{}.out", name));
        match self.process_one(&claimed, &out_path) {
            Ok(lines_out) => {
                self.store.record_processed_file(&name);
                self.commit_file(&claimed, &name);
                info!("Finished processing: {} ({} lines out)", name, lines_out);
            }
            Err(err) => {
                self.store
                    .record_error(FILE_PROCESSOR_TAG, &err.to_string(), None, Some(&name));
                warn!("Error processing {}: {}", name, err);
                self.requeue_file(&claimed, &name);
            }
        }

        self.store.set_current_file(None);
    }

    /// Moves a successfully processed file into `processed/`, suffixing
    /// `.dup` when the name is already taken.
    fn commit_file(&self, claimed: &Path, name: &str) {
        let mut dest = self.layout.processed().join(name);
        if dest.exists() {
            dest = self.layout.processed().join(format!("{}.dup", name));
        }
        if let Err(e) = std::fs::rename(claimed, &dest) {
            let message = format!("failed to move completed file '{}' to processed/: {}", name, e);
            self.store.record_error(FILE_PROCESSOR_TAG, &message, None, None);
            warn!("{}", message);
        }
    }

    /// Moves a failed file back into `unprocessed/` for retry, suffixing
    /// `.retry` when the name is already taken.
    fn requeue_file(&self, claimed: &Path, name: &str) {
        let mut dest = self.layout.unprocessed().join(name);
        if dest.exists() {
            dest = self.layout.unprocessed().join(format!("{}.retry", name));
        }
        match std::fs::rename(claimed, &dest) {
            Ok(()) => info!("Moved failed file back to unprocessed/ for retry: {}", name),
            Err(e) => {
                let message = format!("failed to move failed file '{}' back to unprocessed/: {}", name, e);
                self.store.record_error(FILE_PROCESSOR_TAG, &message, None, None);
                warn!("{}", message);
            }
        }
    }

    /// Builds a fresh engine and streams one file through it.
    fn process_one(&self, input: &Path, output: &Path) -> Result<u64, FlowError> {
        let mut engine = RoutingEngine::from_config(
            &self.config,
            &self.registry,
            self.store.clone(),
            self.options.max_hops,
        )?;
        let summary = run_pipeline(&mut engine, input, Some(output))?;
        Ok(summary.lines_out)
    }

    /// Sleeps up to `total`, waking early when cancellation fires.
    fn sleep_observing_cancellation(&self, total: Duration) {
        let step = Duration::from_millis(50);
        let mut remaining = total;
        while !self.token.is_cancelled() && remaining > Duration::ZERO {
            let chunk = remaining.min(step);
            std::thread::sleep(chunk);
            remaining = remaining.saturating_sub(chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagflow_bootstrap::shutdown::ShutdownCoordinator;

    use crate::infrastructure::metrics::store::StoreLimits;

    const PASSTHROUGH_CONFIG: &str = r#"
nodes:
  - tag: start
    type: stages.passthrough.Passthrough
    routes: [end]
"#;

    fn daemon_parts(base: &Path, config: &str) -> (FileQueueDaemon, Arc<MetricsStore>, ShutdownCoordinator) {
        let registry = StageRegistry::with_builtins();
        let config = FlowConfig::from_yaml(config, &registry).unwrap();
        let store = Arc::new(MetricsStore::new(StoreLimits::default()));
        let layout = QueueLayout::new(base);
        let coordinator = ShutdownCoordinator::default();
        let daemon = FileQueueDaemon::new(
            config,
            registry,
            store.clone(),
            layout,
            coordinator.token(),
            DaemonOptions {
                poll_interval: Duration::from_millis(20),
                pause_between_files: Duration::from_millis(1),
                ..DaemonOptions::default()
            },
        );
        (daemon, store, coordinator)
    }

    #[test]
    fn test_handle_candidate_commits_successful_file() {
        let dir = tempfile::tempdir().unwrap();
        let (daemon, store, _coordinator) = daemon_parts(dir.path(), PASSTHROUGH_CONFIG);
        daemon.layout.ensure().unwrap();

        let input = daemon.layout.unprocessed().join("job.txt");
        std::fs::write(&input, "alpha\nbeta\n").unwrap();

        daemon.handle_candidate(&input);

        assert!(daemon.layout.processed().join("job.txt").is_file());
        let out = std::fs::read_to_string(daemon.layout.processed().join("job.txt.out")).unwrap();
        assert_eq!(out, "alpha\nbeta\n");
        assert_eq!(daemon.layout.counts().unwrap().underprocess, 0);

        let activity = store.get_file_activity(10);
        assert!(activity.current_file.is_none());
        assert_eq!(activity.last_processed[0].filename, "job.txt");
    }

    #[test]
    fn test_handle_candidate_requeues_failed_file() {
        // A config whose start stage emits an unregistered tag fails every
        // file, exercising the retry path.
        const BROKEN: &str = r#"
nodes:
  - tag: start
    type: stages.tagger.Tagger
    routes: [end]
"#;
        let dir = tempfile::tempdir().unwrap();
        let (daemon, store, _coordinator) = daemon_parts(dir.path(), BROKEN);
        daemon.layout.ensure().unwrap();

        let input = daemon.layout.unprocessed().join("bad.txt");
        std::fs::write(&input, "plain line\n").unwrap();

        daemon.handle_candidate(&input);

        // Back in unprocessed/ for retry, not stuck in underprocess/
        assert!(daemon.layout.unprocessed().join("bad.txt").is_file());
        assert_eq!(daemon.layout.counts().unwrap().underprocess, 0);
        assert!(!store.get_errors(10).is_empty());
    }

    #[test]
    fn test_requeue_collision_appends_retry_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let (daemon, _store, _coordinator) = daemon_parts(dir.path(), PASSTHROUGH_CONFIG);
        daemon.layout.ensure().unwrap();

        // A same-named file arrived in unprocessed/ while ours was claimed
        std::fs::write(daemon.layout.unprocessed().join("bad.txt"), "newer\n").unwrap();
        let claimed = daemon.layout.underprocess().join("bad.txt");
        std::fs::write(&claimed, "older\n").unwrap();

        daemon.requeue_file(&claimed, "bad.txt");

        assert!(daemon.layout.unprocessed().join("bad.txt").is_file());
        assert!(daemon.layout.unprocessed().join("bad.txt.retry").is_file());
    }

    #[test]
    fn test_commit_collision_appends_dup_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let (daemon, _store, _coordinator) = daemon_parts(dir.path(), PASSTHROUGH_CONFIG);
        daemon.layout.ensure().unwrap();

        std::fs::write(daemon.layout.processed().join("job.txt"), "earlier run\n").unwrap();
        let claimed = daemon.layout.underprocess().join("job.txt");
        std::fs::write(&claimed, "this run\n").unwrap();

        daemon.commit_file(&claimed, "job.txt");

        assert!(daemon.layout.processed().join("job.txt").is_file());
        assert!(daemon.layout.processed().join("job.txt.dup").is_file());
    }

    #[test]
    fn test_scan_orders_by_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let (daemon, _store, _coordinator) = daemon_parts(dir.path(), PASSTHROUGH_CONFIG);
        daemon.layout.ensure().unwrap();

        let older = daemon.layout.unprocessed().join("older.txt");
        let newer = daemon.layout.unprocessed().join("a-newer.txt");
        std::fs::write(&older, "1\n").unwrap();
        std::thread::sleep(Duration::from_millis(30));
        std::fs::write(&newer, "2\n").unwrap();

        let candidates = daemon.scan_candidates().unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].ends_with("older.txt"));
    }

    #[test]
    fn test_run_observes_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let (daemon, _store, coordinator) = daemon_parts(dir.path(), PASSTHROUGH_CONFIG);

        let handle = std::thread::spawn(move || daemon.run());
        std::thread::sleep(Duration::from_millis(50));
        coordinator.initiate_shutdown();

        let result = handle.join().unwrap();
        assert!(result.is_ok());
    }
}
