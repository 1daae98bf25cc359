// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processor Contract
//!
//! This module defines the unified trait that ALL routing stages implement.
//! The engine hands a stage one line at a time; the stage answers with a
//! sequence of [`Emission`]s - `(tag-list, line)` pairs that decide where
//! each copy of the line travels next.
//!
//! ## Contract
//!
//! - **Zero emissions** drop the line silently: no output, no error.
//! - **Multiple emissions** (or one emission with multiple tags) fan the
//!   line out into independent copies.
//! - Every emitted tag list must be non-empty, and each tag must name a
//!   configured node or the reserved `end` sink. The engine validates this
//!   and treats violations as fatal routing errors.
//!
//! ## Statefulness
//!
//! Stages may hold internal state (counters, accumulators). The engine is
//! single-threaded within one file, so `process` takes `&mut self` and no
//! further synchronization is needed; `Send` is required so a daemon can
//! carry stages onto its worker thread.
//!
//! ## Stateless functions
//!
//! A plain `Fn(&str) -> String` is adapted into a stage by [`FnStage`],
//! which attaches a fixed default tag to every output line. This mirrors
//! the registry's function-style identifiers.
//!
//! ## Errors
//!
//! All failures are returned as [`FlowError`] with a descriptive message.
//! Never panic in production code; the engine records the error against the
//! stage's tag and aborts the current file.

use crate::error::FlowError;
use crate::value_objects::tag::Tag;

/// One `(tag-list, line)` pair produced by a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Tags deciding where copies of the line travel next. Must be
    /// non-empty; each tag must be a configured node tag or `end`.
    pub tags: Vec<Tag>,
    /// The (possibly transformed) line content.
    pub line: String,
}

impl Emission {
    pub fn new(tags: Vec<Tag>, line: impl Into<String>) -> Self {
        Self { tags, line: line.into() }
    }

    /// Convenience constructor for the common single-tag case.
    pub fn single(tag: Tag, line: impl Into<String>) -> Self {
        Self {
            tags: vec![tag],
            line: line.into(),
        }
    }
}

/// Unified trait that all routing stages implement.
///
/// Implementations must be `Send` so stages can move onto the file-queue
/// daemon's worker thread; the engine itself never shares a stage across
/// threads.
pub trait Processor: Send {
    /// Processes a single line, returning the emissions that route its
    /// output onward.
    ///
    /// Returning an empty vector drops the line. Returning an error aborts
    /// the current file; the engine records it against this stage's tag.
    fn process(&mut self, line: &str) -> Result<Vec<Emission>, FlowError>;
}

/// Adapter wrapping a stateless line function into a [`Processor`],
/// attaching a fixed default tag to every output.
pub struct FnStage<F> {
    tag: Tag,
    func: F,
}

impl<F> FnStage<F>
where
    F: FnMut(&str) -> String + Send,
{
    pub fn new(tag: Tag, func: F) -> Self {
        Self { tag, func }
    }
}

impl<F> Processor for FnStage<F>
where
    F: FnMut(&str) -> String + Send,
{
    fn process(&mut self, line: &str) -> Result<Vec<Emission>, FlowError> {
        let out = (self.func)(line);
        Ok(vec![Emission::single(self.tag.clone(), out)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dropper;

    impl Processor for Dropper {
        fn process(&mut self, _line: &str) -> Result<Vec<Emission>, FlowError> {
            Ok(Vec::new())
        }
    }

    struct Counter {
        seen: u64,
    }

    impl Processor for Counter {
        fn process(&mut self, line: &str) -> Result<Vec<Emission>, FlowError> {
            self.seen += 1;
            Ok(vec![Emission::single(Tag::end(), format!("{}: {}", self.seen, line))])
        }
    }

    #[test]
    fn test_fn_stage_attaches_default_tag() {
        let mut stage = FnStage::new(Tag::end(), |line: &str| line.to_uppercase());
        let out = stage.process("abc").unwrap();
        assert_eq!(out, vec![Emission::single(Tag::end(), "ABC")]);
    }

    #[test]
    fn test_zero_emissions_is_a_valid_answer() {
        let mut stage = Dropper;
        assert!(stage.process("anything").unwrap().is_empty());
    }

    #[test]
    fn test_stateful_stage_keeps_its_own_state() {
        let mut stage = Counter { seen: 0 };
        let first = stage.process("a").unwrap();
        let second = stage.process("b").unwrap();
        assert_eq!(first[0].line, "1: a");
        assert_eq!(second[0].line, "2: b");
    }

    #[test]
    fn test_emission_single_equivalence() {
        let a = Emission::single(Tag::end(), "x");
        let b = Emission::new(vec![Tag::end()], "x");
        assert_eq!(a, b);
    }
}
