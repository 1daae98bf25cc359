// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Built-in routing stages and the registry that resolves config
//! identifiers to stage instances.

pub mod counter;
pub mod passthrough;
pub mod registry;
pub mod splitter;
pub mod tagger;
pub mod uppercase;

pub use counter::LineCounter;
pub use passthrough::Passthrough;
pub use registry::StageRegistry;
pub use splitter::SplitLines;
pub use tagger::Tagger;
pub use uppercase::Uppercase;
