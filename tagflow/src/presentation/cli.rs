// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! Three verbs:
//!
//! - `tagflow single <input>` - process one file and exit
//! - `tagflow watch` - monitor a directory queue continuously
//! - `tagflow validate` - validate a routing config
//!
//! Tracing and the dashboard use paired `--x`/`--no-x` flags; when neither
//! is given, tracing falls back to the `TRACE_ENABLED` environment default
//! and then to the mode default (off for `single`, on for `watch`), and
//! the dashboard defaults off for `single` and on for `watch`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Run a tag-routed line processing pipeline with observability.
#[derive(Debug, Parser)]
#[command(name = "tagflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process a single file through the routing graph and exit.
    Single {
        /// Input file to process.
        input: PathBuf,

        /// Path to the routing config file (YAML).
        #[arg(long, default_value = "pipeline.yaml")]
        config: PathBuf,

        /// Output file; prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Enable tracing of line journeys through the graph.
        #[arg(long, overrides_with = "no_trace")]
        trace: bool,

        /// Disable tracing of line journeys through the graph.
        #[arg(long, overrides_with = "trace")]
        no_trace: bool,

        /// Start the web dashboard for live metrics.
        #[arg(long, overrides_with = "no_dashboard")]
        dashboard: bool,

        /// Do not start the web dashboard.
        #[arg(long, overrides_with = "dashboard")]
        no_dashboard: bool,

        /// Port for the web dashboard.
        #[arg(long, default_value_t = 8000)]
        dashboard_port: u16,
    },

    /// Continuously monitor a directory for new files and process them.
    ///
    /// Files dropped into `<watch-dir>/unprocessed/` are claimed, routed,
    /// and committed to `<watch-dir>/processed/`.
    Watch {
        /// Directory to monitor; the queue subdirectories are created
        /// automatically.
        #[arg(long, default_value = "watch_dir")]
        watch_dir: PathBuf,

        /// Path to the routing config file (YAML).
        #[arg(long, default_value = "pipeline.yaml")]
        config: PathBuf,

        /// Enable tracing of line journeys through the graph.
        #[arg(long, overrides_with = "no_trace")]
        trace: bool,

        /// Disable tracing of line journeys through the graph.
        #[arg(long, overrides_with = "trace")]
        no_trace: bool,

        /// Start the web dashboard for live metrics.
        #[arg(long, overrides_with = "no_dashboard")]
        dashboard: bool,

        /// Do not start the web dashboard.
        #[arg(long, overrides_with = "dashboard")]
        no_dashboard: bool,

        /// Port for the web dashboard.
        #[arg(long, default_value_t = 8000)]
        dashboard_port: u16,

        /// Maximum number of traces kept in memory.
        #[arg(long, default_value_t = 1000)]
        max_traces: usize,

        /// Maximum number of errors kept in memory.
        #[arg(long, default_value_t = 100)]
        max_errors: usize,
    },

    /// Validate a routing config and print a node summary.
    Validate {
        /// Path to the routing config file (YAML).
        #[arg(long, default_value = "pipeline.yaml")]
        config: PathBuf,
    },
}

/// Folds a `--x`/`--no-x` flag pair into an explicit choice, `None` when
/// neither was given.
pub fn flag_pair(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_parses_with_defaults() {
        let cli = Cli::parse_from(["tagflow", "single", "input.txt"]);
        match cli.command {
            Commands::Single {
                input,
                config,
                output,
                trace,
                no_trace,
                dashboard_port,
                ..
            } => {
                assert_eq!(input, PathBuf::from("input.txt"));
                assert_eq!(config, PathBuf::from("pipeline.yaml"));
                assert!(output.is_none());
                assert!(!trace);
                assert!(!no_trace);
                assert_eq!(dashboard_port, 8000);
            }
            _ => panic!("expected single"),
        }
    }

    #[test]
    fn test_watch_parses_limits() {
        let cli = Cli::parse_from([
            "tagflow",
            "watch",
            "--watch-dir",
            "queue",
            "--no-trace",
            "--max-traces",
            "50",
            "--max-errors",
            "5",
        ]);
        match cli.command {
            Commands::Watch {
                watch_dir,
                trace,
                no_trace,
                max_traces,
                max_errors,
                ..
            } => {
                assert_eq!(watch_dir, PathBuf::from("queue"));
                assert!(!trace);
                assert!(no_trace);
                assert_eq!(max_traces, 50);
                assert_eq!(max_errors, 5);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_flag_pair_resolution() {
        assert_eq!(flag_pair(true, false), Some(true));
        assert_eq!(flag_pair(false, true), Some(false));
        assert_eq!(flag_pair(false, false), None);
    }

    #[test]
    fn test_later_flag_wins() {
        let cli = Cli::parse_from(["tagflow", "single", "x", "--trace", "--no-trace"]);
        match cli.command {
            Commands::Single { trace, no_trace, .. } => {
                assert!(!trace);
                assert!(no_trace);
            }
            _ => panic!("expected single"),
        }
    }
}
