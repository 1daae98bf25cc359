// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tagflow Bootstrap
//!
//! Process-lifecycle concerns that sit outside the application proper:
//!
//! - [`logger`] - a minimal logging abstraction for the bootstrap phase,
//!   before (or independent of) the tracing subscriber
//! - [`shutdown`] - cancellation tokens and a coordinator for graceful
//!   shutdown with a grace period
//! - [`exit_code`] - mapping run outcomes to process exit codes
//!
//! The crate deliberately knows nothing about routing, stages, or metrics;
//! it is reusable plumbing between `main` and the application layer.

pub mod exit_code;
pub mod logger;
pub mod shutdown;

pub use exit_code::ExitCode;
pub use logger::{BootstrapLogger, ConsoleLogger, NoOpLogger};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
