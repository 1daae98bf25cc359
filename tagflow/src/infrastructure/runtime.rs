// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Runtime: the tag-routed dispatch engine.

pub mod router;

pub use router::{RoutingEngine, RunSummary, DEFAULT_MAX_HOPS};
