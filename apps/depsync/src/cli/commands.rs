//! # CLI Command Implementations

use super::{GenerateArgs, RunStatus};
use crate::config::RunConfig;
use crate::inputs;
use depsync_core::{
    DependencyPlan, DepsyncError, GenerationInputs, GenerationReport, GraphStore,
    PluginDependencyPlan, StaleKind, StaleSuppression, TestPluginDependencyPlan,
    UnresolvedDependency, UnresolvedEntry, generate,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Output flags shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    pub json: bool,
    pub verbose: bool,
}

#[derive(Serialize)]
struct PlanSet<'a> {
    content_modules: &'a [DependencyPlan],
    plugins: &'a [PluginDependencyPlan],
    test_plugins: &'a [TestPluginDependencyPlan],
}

// =============================================================================
// GENERATE COMMAND
// =============================================================================

/// Run one generation pass.
///
/// Fails the build on blocking pipeline errors, and in check mode also on
/// stale suppressions.
pub async fn cmd_generate(
    config_path: Option<&Path>,
    args: &GenerateArgs,
    output: OutputMode,
) -> Result<RunStatus, DepsyncError> {
    let mut config = RunConfig::load(config_path)?;
    if args.update {
        config.update_suppressions = true;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }

    let graph = inputs::load_graph(&args.graph)?;
    let descriptors = Arc::new(inputs::load_descriptors(&args.descriptors)?);
    let suppressions = inputs::load_suppressions(&args.suppressions)?;

    let mut generation =
        GenerationInputs::new(config.planning_context(suppressions, descriptors.clone()));
    generation.suppressed_error_keys = config.suppressed_error_keys.clone();

    let store = GraphStore::new(graph);
    let report = generate(&store, &generation).await?;
    tracing::debug!(descriptor_loads = descriptors.load_count(), "descriptor cache");

    if let Some(path) = &args.plans {
        inputs::write_json(
            path,
            &PlanSet {
                content_modules: &report.content_module_plans,
                plugins: &report.plugin_plans,
                test_plugins: &report.test_plugin_plans,
            },
        )?;
    }

    let written = config.update_suppressions && report.suppressions.modified;
    if written {
        inputs::write_suppressions(&args.suppressions, &report.suppressions.config)?;
    }

    let stale_fails = !config.update_suppressions && report.stale_suppression_count() > 0;
    for stale in &report.suppressions.stale {
        tracing::warn!(entity = %stale.entity, "stale suppression: {}", describe_stale(stale));
    }
    for error in &report.blocking_errors {
        tracing::warn!("{error}");
    }

    if output.json {
        print_json_report(&report, written);
    } else {
        print_text_report(&report, written, output.verbose);
    }

    if report.has_blocking_errors() || stale_fails {
        Ok(RunStatus::Failed)
    } else {
        Ok(RunStatus::Passed)
    }
}

fn describe_stale(stale: &StaleSuppression) -> String {
    match &stale.kind {
        StaleKind::Dependency { kind, dependency } => format!("{kind} {dependency}"),
        StaleKind::AllowMissingPluginId => "allow_missing_plugin_id".to_string(),
    }
}

fn describe_unresolved(entry: &UnresolvedEntry) -> String {
    match &entry.dependency {
        UnresolvedDependency::ContentModule {
            name,
            owning_plugins,
        } => {
            let owners: Vec<&str> = owning_plugins.iter().map(|p| p.as_str()).collect();
            format!(
                "{} needs module {} (owners: {})",
                entry.required_by,
                name,
                if owners.is_empty() { "none".to_string() } else { owners.join(", ") }
            )
        }
        UnresolvedDependency::Plugin { id, aliases } => {
            let aliases: Vec<&str> = aliases.iter().map(|a| a.as_str()).collect();
            format!(
                "{} needs {} from plugin {} (known as: {})",
                entry.required_by,
                entry.module,
                id,
                aliases.join(", ")
            )
        }
    }
}

fn print_json_report(report: &GenerationReport, suppressions_written: bool) {
    let unresolved: Vec<serde_json::Value> = report
        .test_plugin_plans
        .iter()
        .flat_map(|plan| {
            plan.unresolved_dependencies.iter().map(|entry| {
                serde_json::json!({
                    "test_plugin": plan.plugin_id,
                    "required_by": entry.required_by,
                    "module": entry.module,
                    "dependency": entry.dependency,
                })
            })
        })
        .collect();
    let unknown: Vec<serde_json::Value> = report
        .unknown_dependencies
        .iter()
        .map(|(module, dependency)| {
            serde_json::json!({ "module": module, "dependency": dependency })
        })
        .collect();

    let output = serde_json::json!({
        "content_modules": report.content_module_plans.len(),
        "skipped_modules": report.skipped_modules,
        "plugins": report.plugin_plans.len(),
        "test_plugins": report.test_plugin_plans.len(),
        "changed_descriptors": report.changed_descriptor_count(),
        "filtered_embedded": report.filtered_embedded_count(),
        "duplicate_declarations": report.duplicate_declaration_count(),
        "suppression_usages": report.usages.len(),
        "stale_suppressions": report.suppressions.stale,
        "suppressions_modified": report.suppressions.modified,
        "suppressions_written": suppressions_written,
        "blocking_errors": report.blocking_errors,
        "suppressed_errors": report.suppressed_errors,
        "unresolved": unresolved,
        "unknown_dependencies": unknown,
        "fingerprint": report.fingerprint,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).unwrap_or_default()
    );
}

fn print_text_report(report: &GenerationReport, suppressions_written: bool, verbose: bool) {
    println!("Dependency Generation");
    println!("=====================");
    println!(
        "Content modules:        {} planned, {} skipped",
        report.content_module_plans.len(),
        report.skipped_modules.len()
    );
    println!("Plugins:                {}", report.plugin_plans.len());
    println!("Test plugins:           {}", report.test_plugin_plans.len());
    println!("Changed descriptors:    {}", report.changed_descriptor_count());
    println!("Filtered embedded:      {}", report.filtered_embedded_count());
    println!("Duplicate declarations: {}", report.duplicate_declaration_count());
    println!("Unresolved (tests):     {}", report.unresolved_count());
    println!("Unknown dependencies:   {}", report.unknown_dependencies.len());
    println!("Suppression usages:     {}", report.usages.len());
    println!("Stale suppressions:     {}", report.stale_suppression_count());
    println!(
        "Errors:                 {} blocking, {} suppressed",
        report.blocking_errors.len(),
        report.suppressed_errors.len()
    );
    println!("Checksum:               {:016x}", report.fingerprint.checksum);
    if let Some(hash) = &report.fingerprint.blake3 {
        println!("BLAKE3:                 {hash}");
    }
    if suppressions_written {
        println!();
        println!("Suppression file updated.");
    }

    if !report.blocking_errors.is_empty() {
        println!();
        println!("Blocking errors:");
        for error in &report.blocking_errors {
            println!("  {error}");
            println!("    suppress with key: {}", error.key());
        }
    }
    if !report.suppressions.stale.is_empty() {
        println!();
        println!("Stale suppressions:");
        for stale in &report.suppressions.stale {
            println!("  {}: {}", stale.entity, describe_stale(stale));
        }
    }

    if !verbose {
        return;
    }
    for plan in &report.test_plugin_plans {
        for entry in &plan.unresolved_dependencies {
            println!("  [unresolved] {}: {}", plan.plugin_id, describe_unresolved(entry));
        }
    }
    for plan in &report.plugin_plans {
        for id in &plan.duplicate_declaration_plugin_ids {
            println!("  [duplicate] {} declares {} in two places", plan.plugin_id, id);
        }
    }
    for (module, dependency) in &report.unknown_dependencies {
        println!("  [unknown] {module} depends on unknown module {dependency}");
    }
    for plan in report.content_module_plans.iter().filter(|p| p.changes_descriptor()) {
        println!("  [changed] {} ({})", plan.name, plan.descriptor_path);
    }
}

// =============================================================================
// SNAPSHOT COMMAND
// =============================================================================

/// Write a binary snapshot of a graph document.
pub fn cmd_snapshot(
    graph: &Path,
    output: &Path,
    mode: OutputMode,
) -> Result<RunStatus, DepsyncError> {
    let size = inputs::write_graph_snapshot(graph, output)?;

    if mode.json {
        let output = serde_json::json!({
            "input": graph.to_string_lossy(),
            "output": output.to_string_lossy(),
            "bytes": size,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Snapshot written to {} ({} bytes)", output.display(), size);
    }
    Ok(RunStatus::Passed)
}
