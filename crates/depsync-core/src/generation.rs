//! # Generation
//!
//! One full run: content modules (with graph write-back), plugins, test
//! plugins, library validators, then suppression reconciliation.
//!
//! Every count a caller needs to decide pass/fail is exposed as a number or
//! a structured list, never as formatted text.

use crate::fingerprint::{PlanFingerprint, fingerprint_plans};
use crate::graph::GraphQuery;
use crate::planner::{
    DependencyPlan, PlanningContext, PluginDependencyPlan, TestPluginDependencyPlan,
    plan_content_modules, plan_plugins, plan_test_plugins,
};
use crate::reconciler::{PluginIdStatus, ReconcileInput, ReconcileOutcome, reconcile};
use crate::store::GraphStore;
use crate::suppression::SuppressionUsage;
use crate::types::{ContentModuleName, DepsyncError, PipelineError, PluginId};
use crate::validators::validate_libraries;
use std::collections::{BTreeMap, BTreeSet};

/// Inputs of one run besides the graph.
#[derive(Debug, Clone)]
pub struct GenerationInputs {
    pub context: PlanningContext,
    /// Pipeline error keys (`<kind>:<entity>`) that do not block.
    pub suppressed_error_keys: BTreeSet<String>,
}

impl GenerationInputs {
    #[must_use]
    pub fn new(context: PlanningContext) -> Self {
        Self {
            context,
            suppressed_error_keys: BTreeSet::new(),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub content_module_plans: Vec<DependencyPlan>,
    pub plugin_plans: Vec<PluginDependencyPlan>,
    pub test_plugin_plans: Vec<TestPluginDependencyPlan>,
    pub skipped_modules: Vec<ContentModuleName>,
    /// Pipeline errors that fail the run.
    pub blocking_errors: Vec<PipelineError>,
    /// Pipeline errors excused by key.
    pub suppressed_errors: Vec<PipelineError>,
    /// `(module, dependency)` pairs pointing at modules unknown to the graph.
    pub unknown_dependencies: Vec<(ContentModuleName, ContentModuleName)>,
    /// Every usage of the run, sorted.
    pub usages: Vec<SuppressionUsage>,
    pub suppressions: ReconcileOutcome,
    pub fingerprint: PlanFingerprint,
}

impl GenerationReport {
    #[must_use]
    pub fn stale_suppression_count(&self) -> usize {
        self.suppressions.stale_count()
    }

    #[must_use]
    pub fn duplicate_declaration_count(&self) -> usize {
        self.plugin_plans
            .iter()
            .map(|plan| plan.duplicate_declaration_plugin_ids.len())
            .sum()
    }

    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        self.test_plugin_plans
            .iter()
            .map(|plan| plan.unresolved_dependencies.len())
            .sum()
    }

    #[must_use]
    pub fn filtered_embedded_count(&self) -> usize {
        self.content_module_plans
            .iter()
            .map(|plan| plan.filtered_embedded_dependencies.len())
            .sum()
    }

    /// Content-module and plugin plans whose written sets differ from the descriptor.
    #[must_use]
    pub fn changed_descriptor_count(&self) -> usize {
        let modules = self
            .content_module_plans
            .iter()
            .filter(|plan| plan.changes_descriptor())
            .count();
        let plugins = self
            .plugin_plans
            .iter()
            .filter(|plan| {
                plan.error.is_none()
                    && (plan.module_dependencies != plan.existing_module_dependencies
                        || plan.plugin_dependencies != plan.existing_plugin_dependencies
                        || plan.remove_legacy_depends)
            })
            .count();
        modules + plugins
    }

    #[must_use]
    pub fn has_blocking_errors(&self) -> bool {
        !self.blocking_errors.is_empty()
    }
}

/// Run every planner and the reconciler once.
pub async fn generate(
    store: &GraphStore,
    inputs: &GenerationInputs,
) -> Result<GenerationReport, DepsyncError> {
    let ctx = &inputs.context;
    tracing::info!(
        update = ctx.update_suppressions,
        concurrency = ctx.concurrency,
        full_scope = ctx.scope.is_full(),
        "generation started"
    );

    let modules = plan_content_modules(store, ctx).await?;
    // Plugins and validators read the written-back snapshot.
    let graph = store.snapshot();
    let plugins = plan_plugins(graph.clone(), ctx).await?;
    let test_plugins = plan_test_plugins(graph.clone(), ctx).await?;

    let planned_modules: Vec<ContentModuleName> = modules
        .plans
        .iter()
        .filter(|plan| plan.error.is_none())
        .map(|plan| plan.name.clone())
        .collect();
    let validation = validate_libraries(&graph, &planned_modules, &ctx.suppressions);

    let mut usages: Vec<SuppressionUsage> = modules
        .plans
        .iter()
        .flat_map(|plan| plan.suppression_usages.iter().cloned())
        .chain(plugins.plans.iter().flat_map(|plan| plan.suppression_usages.iter().cloned()))
        .chain(test_plugins.iter().flat_map(|plan| plan.suppression_usages.iter().cloned()))
        .chain(validation.usages.iter().cloned())
        .collect();
    usages.sort();

    let mut processed_modules: BTreeSet<ContentModuleName> =
        planned_modules.iter().cloned().collect();
    processed_modules.extend(modules.skipped.iter().cloned());
    let mut processed_plugins: BTreeSet<PluginId> = plugins
        .plans
        .iter()
        .map(|plan| plan.plugin_id.clone())
        .chain(test_plugins.iter().map(|plan| plan.plugin_id.clone()))
        .collect();
    if ctx.scope.is_full() {
        // Entries for entities that no longer exist were in scope and nothing backs them.
        processed_modules.extend(
            ctx.suppressions
                .content_modules
                .keys()
                .filter(|name| graph.content_module(name).is_none())
                .cloned(),
        );
        processed_plugins.extend(
            ctx.suppressions
                .plugins
                .keys()
                .filter(|id| graph.plugin(id).is_none())
                .cloned(),
        );
    }
    let plugin_ids: BTreeMap<PluginId, PluginIdStatus> = plugins
        .plans
        .iter()
        .map(|plan| {
            (
                plan.plugin_id.clone(),
                PluginIdStatus {
                    missing: plan.missing_plugin_id,
                    allowance_used: plan.allow_missing_plugin_id_used,
                },
            )
        })
        .collect();

    let suppressions = reconcile(ReconcileInput {
        previous: &ctx.suppressions,
        usages: &usages,
        processed_modules: &processed_modules,
        processed_plugins: &processed_plugins,
        plugin_ids: &plugin_ids,
    });

    let (suppressed_errors, blocking_errors): (Vec<PipelineError>, Vec<PipelineError>) = modules
        .errors
        .iter()
        .chain(&plugins.errors)
        .chain(&validation.errors)
        .cloned()
        .partition(|error| inputs.suppressed_error_keys.contains(&error.key()));
    let mut blocking_errors = blocking_errors;
    blocking_errors.sort();
    let mut suppressed_errors = suppressed_errors;
    suppressed_errors.sort();

    let fingerprint = fingerprint_plans(&modules.plans, &plugins.plans, &test_plugins)?;

    let report = GenerationReport {
        content_module_plans: modules.plans,
        plugin_plans: plugins.plans,
        test_plugin_plans: test_plugins,
        skipped_modules: modules.skipped,
        blocking_errors,
        suppressed_errors,
        unknown_dependencies: validation.unknown_dependencies,
        usages,
        suppressions,
        fingerprint,
    };
    tracing::info!(
        modules = report.content_module_plans.len(),
        plugins = report.plugin_plans.len(),
        test_plugins = report.test_plugin_plans.len(),
        blocking_errors = report.blocking_errors.len(),
        stale = report.stale_suppression_count(),
        duplicates = report.duplicate_declaration_count(),
        unresolved = report.unresolved_count(),
        "generation complete"
    );
    Ok(report)
}
