// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end routing scenarios: full configs driven through the engine
//! and the pipeline driver, exactly as the CLI wires them.

use std::path::Path;
use std::sync::Arc;

use tagflow::infrastructure::stages::{LineCounter, Passthrough};
use tagflow::{FlowConfig, MetricsStore, RoutingEngine, StageRegistry, StoreLimits, Tag};
use tagflow_domain::{FlowError, FnStage};

fn run_config(
    config_yaml: &str,
    registry: &StageRegistry,
    store: Arc<MetricsStore>,
    max_hops: u32,
    input: &[&str],
) -> Result<Vec<String>, FlowError> {
    let config = FlowConfig::from_yaml(config_yaml, registry)?;
    let mut engine = RoutingEngine::from_config(&config, registry, store, max_hops)?;
    let mut out = Vec::new();
    engine.run(input.iter().map(|l| Ok(l.to_string())), |line| {
        out.push(line.to_string());
        Ok(())
    })?;
    Ok(out)
}

fn store() -> Arc<MetricsStore> {
    Arc::new(MetricsStore::new(StoreLimits::default()))
}

#[test]
fn tagger_split_preserves_per_line_order() {
    let config = r#"
nodes:
  - tag: start
    type: stages.tagger.Tagger
    routes: [error, warn, info]
  - tag: error
    type: stages.passthrough.Passthrough
    routes: [end]
  - tag: warn
    type: stages.passthrough.Passthrough
    routes: [end]
  - tag: info
    type: stages.passthrough.Passthrough
    routes: [end]
"#;
    let registry = StageRegistry::with_builtins();
    let out = run_config(config, &registry, store(), 1000, &["hello", "ERROR: boom", "ok"]).unwrap();
    assert_eq!(out, vec!["hello", "ERROR: boom", "ok"]);
}

#[test]
fn uppercase_then_end() {
    let config = r#"
nodes:
  - tag: start
    type: stages.upper.Uppercase
    routes: [end]
"#;
    let registry = StageRegistry::with_builtins();
    let out = run_config(config, &registry, store(), 1000, &["abc", "def"]).unwrap();
    assert_eq!(out, vec!["ABC", "DEF"]);
}

#[test]
fn splitter_fans_out_in_bfs_order() {
    let config = r#"
nodes:
  - tag: start
    type: stages.splitter.SplitLines
    routes: [end]
"#;
    let registry = StageRegistry::with_builtins();
    let out = run_config(config, &registry, store(), 1000, &["a, b,c"]).unwrap();
    assert_eq!(out, vec!["a", "b", "c"]);
}

#[test]
fn hop_limit_aborts_with_single_router_error() {
    let config = r#"
nodes:
  - tag: start
    type: test.loop
    routes: [loop]
  - tag: loop
    type: test.loop
    routes: [loop]
"#;
    let mut registry = StageRegistry::with_builtins();
    registry.register("test.loop", || {
        Ok(Box::new(FnStage::new(Tag::new("loop")?, |line: &str| line.to_string())))
    });

    let metrics = store();
    let result = run_config(config, &registry, metrics.clone(), 4, &["round and round"]);

    let err = result.unwrap_err();
    assert!(matches!(err, FlowError::HopLimitExceeded(_)));

    let errors = metrics.get_errors(10);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].processor, "router");
    assert!(errors[0].message.contains("max hops (4)"));
}

#[test]
fn stateful_counters_are_isolated_per_node() {
    let config = r#"
nodes:
  - tag: start
    type: test.passthrough.to-c1
    routes: [c1]
  - tag: c1
    type: test.counter.to-c2
    routes: [c2]
  - tag: c2
    type: stages.counter.LineCounter
    routes: [end]
"#;
    let mut registry = StageRegistry::with_builtins();
    registry.register("test.passthrough.to-c1", || {
        Ok(Box::new(Passthrough::with_tag(Tag::new("c1")?)))
    });
    registry.register("test.counter.to-c2", || Ok(Box::new(LineCounter::new(Tag::new("c2")?))));

    let metrics = store();
    let out = run_config(config, &registry, metrics.clone(), 1000, &["a", "b", "c"]).unwrap();
    assert_eq!(out.len(), 3);
    // Both counters saw every line and prefixed independently
    assert_eq!(out[0], "1: 1: a");

    let stats = metrics.get_stats();
    assert_eq!(stats["c1"].count, 3);
    assert_eq!(stats["c2"].count, 3);
}

#[test]
fn single_file_cli_flow_writes_output() {
    // The same path the `single` use case takes: config from disk, lazy
    // line reader, file sink.
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("pipeline.yaml");
    let input_path = dir.path().join("input.txt");
    let output_path = dir.path().join("out").join("result.txt");

    std::fs::write(
        &config_path,
        "nodes:\n  - tag: start\n    type: stages.upper.Uppercase\n    routes: [end]\n",
    )
    .unwrap();
    std::fs::write(&input_path, "one\ntwo\nthree\n").unwrap();

    let registry = StageRegistry::with_builtins();
    let config = FlowConfig::from_path(Path::new(&config_path), &registry).unwrap();
    let mut engine = RoutingEngine::from_config(&config, &registry, store(), 1000).unwrap();
    let summary = tagflow::run_pipeline(&mut engine, &input_path, Some(&output_path)).unwrap();

    assert_eq!(summary.lines_in, 3);
    assert_eq!(summary.lines_out, 3);
    assert_eq!(
        std::fs::read_to_string(&output_path).unwrap(),
        "ONE\nTWO\nTHREE\n"
    );
}

#[test]
fn traces_follow_lines_through_the_graph() {
    let config = r#"
nodes:
  - tag: start
    type: stages.tagger.Tagger
    routes: [info]
  - tag: info
    type: stages.upper.Uppercase
    routes: [end]
"#;
    let registry = StageRegistry::with_builtins();
    let metrics = Arc::new(MetricsStore::new(StoreLimits::default()).with_trace_enabled(true));
    let out = run_config(config, &registry, metrics.clone(), 1000, &["quiet line"]).unwrap();
    assert_eq!(out, vec!["QUIET LINE"]);

    let traces = metrics.get_traces(10, None, None, None);
    assert_eq!(traces.len(), 1);
    let trace = &traces[0];
    assert_eq!(trace.original_content, "quiet line");
    assert_eq!(trace.final_content, "QUIET LINE");
    assert_eq!(trace.path, vec!["start", "info", "end"]);
    assert!(trace.all_tags.contains(&"info".to_string()));
    assert!(trace.all_tags.contains(&"end".to_string()));
    assert!(trace.total_time >= 0.0);
}
