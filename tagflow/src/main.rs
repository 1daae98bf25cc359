// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tagflow CLI Entry Point
//!
//! Parses the command line, initializes the tracing subscriber, dispatches
//! to the matching use case, and maps the outcome to a process exit code
//! (`0` success, `1` bad input / config error / routing failure).

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tagflow::application::use_cases::{
    run_single, run_watch, validate_config, SingleFileOptions, WatchOptions,
};
use tagflow::presentation::cli::{flag_pair, Cli, Commands};
use tagflow_bootstrap::exit_code::ExitCode;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Single {
            input,
            config,
            output,
            trace,
            no_trace,
            dashboard,
            no_dashboard,
            dashboard_port,
        } => {
            run_single(SingleFileOptions {
                input,
                config,
                output,
                trace: flag_pair(trace, no_trace),
                dashboard: flag_pair(dashboard, no_dashboard).unwrap_or(false),
                dashboard_port,
            })
            .await?;
        }
        Commands::Watch {
            watch_dir,
            config,
            trace,
            no_trace,
            dashboard,
            no_dashboard,
            dashboard_port,
            max_traces,
            max_errors,
        } => {
            run_watch(WatchOptions {
                watch_dir,
                config,
                trace: flag_pair(trace, no_trace),
                dashboard: flag_pair(dashboard, no_dashboard).unwrap_or(true),
                dashboard_port,
                max_traces,
                max_errors,
            })
            .await?;
        }
        Commands::Validate { config } => {
            validate_config(&config)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = dispatch(cli).await;
    if let Err(err) = &result {
        eprintln!("Error: {}", err);
    }
    ExitCode::from_result(&result).into()
}
