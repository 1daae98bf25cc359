// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure layer: everything that touches files, sockets, clocks, or
//! process-wide state.

pub mod config;
pub mod http;
pub mod metrics;
pub mod runtime;
pub mod stages;
pub mod watch;
