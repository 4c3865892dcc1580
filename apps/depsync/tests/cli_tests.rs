//! Command tests against files in a temporary directory.

#![allow(clippy::unwrap_used, clippy::panic)]

use depsync::cli::{GenerateArgs, OutputMode, RunStatus, cmd_generate, cmd_snapshot};
use depsync::inputs;
use depsync_core::{
    ContentModuleName, ContentSource, DependencyGraph, DependencyScope, DescriptorRoot,
    DescriptorSet, DescriptorSnapshot, GraphDocument, ModuleLoading, RawDependency,
    SuppressionConfig, TargetName, primitives::MAGIC_BYTES,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// FIXTURES
// =============================================================================

const QUIET: OutputMode = OutputMode {
    json: false,
    verbose: false,
};

/// `a` depends on `b`; `a`'s descriptor declares `c` instead.
fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let mut graph = DependencyGraph::new();
    graph
        .add_target(
            TargetName::new("a"),
            vec![RawDependency::new("b", DependencyScope::Compile)],
        )
        .unwrap();
    for module in ["a", "b", "c"] {
        graph
            .add_content_module(
                ContentModuleName::new(module),
                Some(TargetName::new(module)),
                vec![ContentSource::product("IDEA", ModuleLoading::Required)],
            )
            .unwrap();
    }
    let graph_path = dir.join("graph.json");
    std::fs::write(
        &graph_path,
        serde_json::to_string(&GraphDocument::from(&graph)).unwrap(),
    )
    .unwrap();

    let mut descriptors = DescriptorSet::new();
    for (module, declared) in [("a", vec!["c"]), ("b", vec![]), ("c", vec![])] {
        descriptors.insert_module(
            ContentModuleName::new(module),
            DescriptorSnapshot {
                path: format!("{module}.xml"),
                content: "<idea-plugin/>".to_string(),
                root: DescriptorRoot::Standard,
                module_dependencies: declared.into_iter().map(ContentModuleName::new).collect(),
                plugin_dependencies: BTreeSet::new(),
            },
        );
    }
    let descriptors_path = dir.join("descriptors.json");
    std::fs::write(&descriptors_path, serde_json::to_string(&descriptors).unwrap()).unwrap();

    (graph_path, descriptors_path)
}

fn args(dir: &Path, graph: PathBuf, descriptors: PathBuf, update: bool) -> GenerateArgs {
    GenerateArgs {
        graph,
        descriptors,
        suppressions: dir.join("suppressions.json"),
        update,
        concurrency: Some(2),
        plans: None,
    }
}

fn load_suppressions(dir: &Path) -> SuppressionConfig {
    inputs::load_suppressions(&dir.join("suppressions.json")).unwrap()
}

// =============================================================================
// GENERATE
// =============================================================================

#[tokio::test]
async fn test_update_then_check_passes() {
    let dir = TempDir::new().unwrap();
    let (graph, descriptors) = write_inputs(dir.path());

    let update = args(dir.path(), graph.clone(), descriptors.clone(), true);
    assert_eq!(cmd_generate(None, &update, QUIET).await.unwrap(), RunStatus::Passed);

    let written = load_suppressions(dir.path());
    let entry = written
        .content_module(&ContentModuleName::new("a"))
        .expect("entry for a");
    let expected: BTreeSet<ContentModuleName> =
        ["b", "c"].into_iter().map(ContentModuleName::new).collect();
    assert_eq!(entry.suppress_modules, expected);

    let check = args(dir.path(), graph, descriptors, false);
    assert_eq!(cmd_generate(None, &check, QUIET).await.unwrap(), RunStatus::Passed);
    assert_eq!(load_suppressions(dir.path()), written);
}

#[tokio::test]
async fn test_check_mode_fails_on_stale_suppression() {
    let dir = TempDir::new().unwrap();
    let (graph, descriptors) = write_inputs(dir.path());
    std::fs::write(
        dir.path().join("suppressions.json"),
        r#"{"content_modules":{"b":{"suppress_modules":["gone"]}}}"#,
    )
    .unwrap();

    let check = args(dir.path(), graph, descriptors, false);
    assert_eq!(cmd_generate(None, &check, QUIET).await.unwrap(), RunStatus::Failed);
}

#[tokio::test]
async fn test_missing_descriptor_blocks_unless_suppressed_by_key() {
    let dir = TempDir::new().unwrap();
    let (graph, _) = write_inputs(dir.path());
    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "{}").unwrap();

    let check = args(dir.path(), graph, empty, false);
    assert_eq!(cmd_generate(None, &check, QUIET).await.unwrap(), RunStatus::Failed);

    let config = dir.path().join("depsync.toml");
    std::fs::write(
        &config,
        r#"suppressed_error_keys = [
            "missing-descriptor:a",
            "missing-descriptor:b",
            "missing-descriptor:c",
        ]"#,
    )
    .unwrap();
    assert_eq!(
        cmd_generate(Some(&config), &check, QUIET).await.unwrap(),
        RunStatus::Passed
    );
}

#[tokio::test]
async fn test_plans_are_written_as_json() {
    let dir = TempDir::new().unwrap();
    let (graph, descriptors) = write_inputs(dir.path());
    let mut run = args(dir.path(), graph, descriptors, false);
    run.plans = Some(dir.path().join("plans.json"));

    cmd_generate(None, &run, OutputMode { json: true, verbose: false })
        .await
        .unwrap();

    let plans: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("plans.json")).unwrap())
            .unwrap();
    let modules = plans["content_modules"].as_array().unwrap();
    assert_eq!(modules.len(), 3);
    assert_eq!(modules[0]["name"], "a");
    assert_eq!(modules[0]["module_dependencies"], serde_json::json!(["b"]));
}

#[tokio::test]
async fn test_missing_graph_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (_, descriptors) = write_inputs(dir.path());
    let run = args(dir.path(), dir.path().join("nope.json"), descriptors, false);
    assert!(cmd_generate(None, &run, QUIET).await.is_err());
}

// =============================================================================
// SNAPSHOT
// =============================================================================

#[tokio::test]
async fn test_snapshot_feeds_generate() {
    let dir = TempDir::new().unwrap();
    let (graph, descriptors) = write_inputs(dir.path());
    let snapshot = dir.path().join("graph.dpsg");

    assert_eq!(cmd_snapshot(&graph, &snapshot, QUIET).unwrap(), RunStatus::Passed);
    let bytes = std::fs::read(&snapshot).unwrap();
    assert!(bytes.starts_with(MAGIC_BYTES));

    let run = args(dir.path(), snapshot, descriptors, true);
    assert_eq!(cmd_generate(None, &run, QUIET).await.unwrap(), RunStatus::Passed);
}
