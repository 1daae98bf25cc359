// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Queue Directory Layout
//!
//! The three lifecycle directories of watch mode, all under one base:
//!
//! - `unprocessed/` - files waiting to be claimed
//! - `underprocess/` - at most the one file currently being worked on
//! - `processed/` - committed files and their `.out` results
//!
//! A file lives in exactly one directory at any instant; every transition
//! is a same-filesystem rename, which is atomic. Startup recovery moves
//! anything left in `underprocess/` (an aborted previous run) back to
//! `unprocessed/`, so `underprocess/` is empty between runs.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use tagflow_domain::FlowError;

/// Cardinalities of the three lifecycle directories.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueCounts {
    pub unprocessed: usize,
    pub underprocess: usize,
    pub processed: usize,
}

/// Paths of the watch-mode queue directories.
#[derive(Debug, Clone)]
pub struct QueueLayout {
    base: PathBuf,
    unprocessed: PathBuf,
    underprocess: PathBuf,
    processed: PathBuf,
}

impl QueueLayout {
    /// Describes the layout under `base` without touching the filesystem.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            unprocessed: base.join("unprocessed"),
            underprocess: base.join("underprocess"),
            processed: base.join("processed"),
            base,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn unprocessed(&self) -> &Path {
        &self.unprocessed
    }

    pub fn underprocess(&self) -> &Path {
        &self.underprocess
    }

    pub fn processed(&self) -> &Path {
        &self.processed
    }

    /// Creates all three directories (and the base) if missing.
    pub fn ensure(&self) -> Result<(), FlowError> {
        for dir in [&self.unprocessed, &self.underprocess, &self.processed] {
            std::fs::create_dir_all(dir).map_err(|e| {
                FlowError::io_error(format!("failed to create queue directory '{}': {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    /// Startup recovery: moves every regular file in `underprocess/` back
    /// to `unprocessed/`. Files found there belong to an aborted run and
    /// must be retried from scratch. Returns the number recovered.
    pub fn recover(&self) -> Result<usize, FlowError> {
        let mut recovered = 0;
        let entries: Vec<PathBuf> = list_files(&self.underprocess)?;
        for path in entries {
            let Some(name) = path.file_name() else { continue };
            let dest = self.unprocessed.join(name);
            match std::fs::rename(&path, &dest) {
                Ok(()) => {
                    info!("Recovered in-progress file back to unprocessed/: {}", name.to_string_lossy());
                    recovered += 1;
                }
                Err(e) => {
                    warn!("Failed to recover {}: {}", path.display(), e);
                }
            }
        }
        Ok(recovered)
    }

    /// Counts regular files in each lifecycle directory.
    pub fn counts(&self) -> Result<QueueCounts, FlowError> {
        Ok(QueueCounts {
            unprocessed: list_files(&self.unprocessed)?.len(),
            underprocess: list_files(&self.underprocess)?.len(),
            processed: list_files(&self.processed)?.len(),
        })
    }
}

/// Regular files directly inside `dir`, sorted by name. The directory
/// handle is dropped before the caller performs any move.
pub(crate) fn list_files(dir: &Path) -> Result<Vec<PathBuf>, FlowError> {
    let read = std::fs::read_dir(dir)
        .map_err(|e| FlowError::io_error(format!("failed to list '{}': {}", dir.display(), e)))?;
    let mut files = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| FlowError::io_error(format!("failed to read entry in '{}': {}", dir.display(), e)))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
