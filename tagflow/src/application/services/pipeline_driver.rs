// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Driver
//!
//! Streams one input file through the routing engine: opens the input as a
//! lazy line iterator (trailing newline stripped), drives the engine, and
//! writes every emitted line to either stdout or a target file (creating
//! parent directories as needed, one `\n`-terminated line per envelope that
//! reached `end`).
//!
//! File handles are scoped: both input and output are released on every
//! exit path, including engine faults.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tagflow_domain::FlowError;

use crate::infrastructure::runtime::router::{RoutingEngine, RunSummary};

/// Opens `path` as a lazy iterator of lines with trailing newlines
/// stripped.
pub fn read_lines(path: &Path) -> Result<impl Iterator<Item = Result<String, FlowError>>, FlowError> {
    let file = File::open(path)
        .map_err(|e| FlowError::io_error(format!("failed to open input '{}': {}", path.display(), e)))?;
    Ok(BufReader::new(file).lines().map(|res| res.map_err(FlowError::from)))
}

/// Where emitted lines go: the console or a file.
pub enum OutputSink {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

impl OutputSink {
    pub fn stdout() -> Self {
        OutputSink::Stdout(io::stdout())
    }

    /// Creates (or truncates) the output file, creating parent directories
    /// first.
    pub fn create(path: &Path) -> Result<Self, FlowError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    FlowError::io_error(format!("failed to create output directory '{}': {}", parent.display(), e))
                })?;
            }
        }
        let file = File::create(path)
            .map_err(|e| FlowError::io_error(format!("failed to create output '{}': {}", path.display(), e)))?;
        Ok(OutputSink::File(BufWriter::new(file)))
    }

    /// Writes one line followed by `\n`.
    pub fn write_line(&mut self, line: &str) -> Result<(), FlowError> {
        match self {
            OutputSink::Stdout(out) => writeln!(out, "{}", line).map_err(FlowError::from),
            OutputSink::File(out) => writeln!(out, "{}", line).map_err(FlowError::from),
        }
    }

    pub fn flush(&mut self) -> Result<(), FlowError> {
        match self {
            OutputSink::Stdout(out) => out.flush().map_err(FlowError::from),
            OutputSink::File(out) => out.flush().map_err(FlowError::from),
        }
    }
}

/// Runs a single file through the engine, streaming output to `output` (or
/// stdout when `None`).
pub fn run_pipeline(
    engine: &mut RoutingEngine,
    input: &Path,
    output: Option<&Path>,
) -> Result<RunSummary, FlowError> {
    let lines = read_lines(input)?;
    let mut sink = match output {
        Some(path) => OutputSink::create(path)?,
        None => OutputSink::stdout(),
    };
    let summary = engine.run(lines, |line| sink.write_line(line))?;
    sink.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::infrastructure::config::loader::FlowConfig;
    use crate::infrastructure::metrics::store::{MetricsStore, StoreLimits};
    use crate::infrastructure::runtime::router::DEFAULT_MAX_HOPS;
    use crate::infrastructure::stages::registry::StageRegistry;

    const UPPER_CONFIG: &str = r#"
nodes:
  - tag: start
    type: stages.upper.Uppercase
    routes: [end]
"#;

    fn engine(config: &str) -> RoutingEngine {
        let registry = StageRegistry::with_builtins();
        let config = FlowConfig::from_yaml(config, &registry).unwrap();
        let store = Arc::new(MetricsStore::new(StoreLimits::default()));
        RoutingEngine::from_config(&config, &registry, store, DEFAULT_MAX_HOPS).unwrap()
    }

    #[test]
    fn test_read_lines_strips_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        std::fs::write(&input, "abc\ndef\n").unwrap();

        let lines: Vec<String> = read_lines(&input).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(lines, vec!["abc", "def"]);
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let err = read_lines(Path::new("/definitely/not/here.txt")).err().unwrap();
        assert!(matches!(err, FlowError::IoError(_)));
    }

    #[test]
    fn test_run_pipeline_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        let output = dir.path().join("nested").join("out.txt");
        std::fs::write(&input, "abc\ndef\n").unwrap();

        let mut engine = engine(UPPER_CONFIG);
        let summary = run_pipeline(&mut engine, &input, Some(&output)).unwrap();

        assert_eq!(summary.lines_in, 2);
        assert_eq!(summary.lines_out, 2);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "ABC\nDEF\n");
    }

    #[test]
    fn test_idempotent_rerun_with_stateless_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        let out_a = dir.path().join("a.out");
        let out_b = dir.path().join("b.out");
        std::fs::write(&input, "one\ntwo\n").unwrap();

        let mut first = engine(UPPER_CONFIG);
        run_pipeline(&mut first, &input, Some(&out_a)).unwrap();
        let mut second = engine(UPPER_CONFIG);
        run_pipeline(&mut second, &input, Some(&out_b)).unwrap();

        assert_eq!(
            std::fs::read(&out_a).unwrap(),
            std::fs::read(&out_b).unwrap()
        );
    }
}
