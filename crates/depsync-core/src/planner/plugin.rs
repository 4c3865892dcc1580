//! # Plugin Dependency Planner
//!
//! Plans the `<dependencies>` section of every production plugin descriptor
//! from the plugin's primary build target.
//!
//! Plugins without a primary target and DSL-generated plugins have nothing
//! to mine and are skipped. Test plugins have their own planner.

use crate::classifier::{DependencySource, classify_dependencies};
use crate::descriptor::PluginDescriptorSnapshot;
use crate::graph::{DependencyGraph, PluginKind, PluginNode};
use crate::planner::{PlanningContext, fan_out};
use crate::suppression::{LedgerInput, SuppressionLedger, SuppressionType, SuppressionUsage};
use crate::types::{
    ContentModuleName, DepsyncError, PipelineError, PipelineErrorKind, PluginId, TargetName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Immutable dependency plan of one plugin descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDependencyPlan {
    pub plugin_id: PluginId,
    pub descriptor_path: String,
    pub descriptor_content: String,
    pub module_dependencies: Vec<ContentModuleName>,
    pub plugin_dependencies: Vec<PluginId>,
    pub existing_module_dependencies: Vec<ContentModuleName>,
    pub existing_plugin_dependencies: Vec<PluginId>,
    /// Deprecated `<depends>` ids currently declared.
    pub legacy_plugin_dependencies: Vec<PluginId>,
    /// Already declared by included fragments; excluded from the written sets.
    pub xi_include_module_dependencies: Vec<ContentModuleName>,
    pub xi_include_plugin_dependencies: Vec<PluginId>,
    /// Ids declared both as `<depends>` and in `<dependencies>`.
    pub duplicate_declaration_plugin_ids: Vec<PluginId>,
    pub suppressed_modules: Vec<ContentModuleName>,
    pub suppressed_plugins: Vec<PluginId>,
    pub suppression_usages: Vec<SuppressionUsage>,
    pub filtered_embedded_dependencies: Vec<ContentModuleName>,
    /// Whether the writer may drop the `<depends>` declarations.
    pub remove_legacy_depends: bool,
    /// The descriptor declares no `<id>`.
    pub missing_plugin_id: bool,
    /// The missing `<id>` was tolerated through an allowance.
    pub allow_missing_plugin_id_used: bool,
    pub error: Option<PipelineError>,
}

/// Output of one plugin planning pass.
#[derive(Debug, Clone, Default)]
pub struct PluginPlanning {
    /// Sorted by plugin id.
    pub plans: Vec<PluginDependencyPlan>,
    /// Sorted by key.
    pub errors: Vec<PipelineError>,
}

impl PluginPlanning {
    /// Number of ids declared in both syntaxes across all plans.
    #[must_use]
    pub fn duplicate_declaration_count(&self) -> usize {
        self.plans
            .iter()
            .map(|plan| plan.duplicate_declaration_plugin_ids.len())
            .sum()
    }
}

/// Plan every in-scope production plugin with a primary target.
pub async fn plan_plugins(
    graph: Arc<DependencyGraph>,
    ctx: &PlanningContext,
) -> Result<PluginPlanning, DepsyncError> {
    let plugins: Vec<(PluginNode, TargetName)> = graph
        .plugins()
        .filter(|plugin| {
            plugin.kind == PluginKind::Production && ctx.scope.includes_plugin(&plugin.id)
        })
        .filter_map(|plugin| {
            plugin
                .primary_target
                .clone()
                .map(|target| (plugin.clone(), target))
        })
        .collect();
    tracing::debug!(plugins = plugins.len(), "planning plugins");

    let task_ctx = ctx.clone();
    let task_graph = Arc::clone(&graph);
    let outcomes = fan_out(plugins, ctx.concurrency, move |(plugin, target)| {
        plan_plugin(task_graph.as_ref(), &task_ctx, &plugin, &target)
    })
    .await?;

    let mut planning = PluginPlanning::default();
    for outcome in outcomes {
        match outcome {
            Ok(plan) => {
                if let Some(error) = &plan.error {
                    planning.errors.push(error.clone());
                }
                planning.plans.push(*plan);
            }
            Err(error) => planning.errors.push(error),
        }
    }
    planning.plans.sort_by(|a, b| a.plugin_id.cmp(&b.plugin_id));
    planning.errors.sort();

    let duplicates = planning.duplicate_declaration_count();
    if duplicates > 0 {
        tracing::warn!(
            duplicates,
            "plugins declare dependencies in both <depends> and <dependencies>"
        );
    }
    tracing::info!(
        plans = planning.plans.len(),
        errors = planning.errors.len(),
        "plugin planning complete"
    );
    Ok(planning)
}

fn plan_plugin(
    graph: &DependencyGraph,
    ctx: &PlanningContext,
    plugin: &PluginNode,
    target: &TargetName,
) -> Result<Box<PluginDependencyPlan>, PipelineError> {
    let Some(descriptor) = ctx.descriptors.plugin_descriptor(&plugin.id) else {
        let error = PipelineError::new(
            &plugin.id,
            PipelineErrorKind::MissingDescriptor,
            "no descriptor snapshot for plugin",
        );
        tracing::warn!(plugin = %plugin.id, "{error}");
        return Err(error);
    };

    let classified = classify_dependencies(
        graph,
        DependencySource::Plugin(plugin),
        target,
        false,
        ctx.libraries.as_ref(),
    );
    Ok(Box::new(assemble_plan(
        ctx,
        plugin,
        &descriptor,
        classified.modules,
        classified.plugins,
        classified.filtered_embedded,
    )))
}

fn assemble_plan(
    ctx: &PlanningContext,
    plugin: &PluginNode,
    descriptor: &PluginDescriptorSnapshot,
    computed_modules: BTreeSet<ContentModuleName>,
    computed_plugins: BTreeSet<PluginId>,
    filtered_embedded: BTreeSet<ContentModuleName>,
) -> PluginDependencyPlan {
    let id = &plugin.id;
    let persisted = ctx.suppressions.plugin(id);

    let duplicates: Vec<PluginId> = descriptor
        .legacy_depends
        .intersection(&descriptor.plugin_dependencies)
        .cloned()
        .collect();

    let missing_plugin_id = descriptor.plugin_id.is_none();
    let allowed_missing = persisted.is_some_and(|s| s.allow_missing_plugin_id);
    let allow_missing_plugin_id_used =
        missing_plugin_id && (allowed_missing || ctx.update_suppressions);
    let error = (missing_plugin_id && !allow_missing_plugin_id_used).then(|| {
        let error = PipelineError::new(
            id,
            PipelineErrorKind::MissingPluginId,
            "plugin descriptor declares no <id>",
        );
        tracing::warn!(plugin = %id, "{error}");
        error
    });

    let computed_modules: BTreeSet<ContentModuleName> = computed_modules
        .difference(&descriptor.xi_include_module_dependencies)
        .cloned()
        .collect();
    let computed_plugins: BTreeSet<PluginId> = computed_plugins
        .difference(&descriptor.xi_include_plugin_dependencies)
        .cloned()
        .collect();
    let existing_plugins: BTreeSet<PluginId> = descriptor
        .plugin_dependencies
        .union(&descriptor.legacy_depends)
        .cloned()
        .collect();

    let empty_modules = BTreeSet::new();
    let empty_plugins = BTreeSet::new();
    let modules = SuppressionLedger::apply(LedgerInput {
        computed: &computed_modules,
        existing: &descriptor.module_dependencies,
        persisted: persisted.map_or(&empty_modules, |s| &s.suppress_modules),
        update_mode: ctx.update_suppressions,
    });
    let plugins = SuppressionLedger::apply(LedgerInput {
        computed: &computed_plugins,
        existing: &existing_plugins,
        persisted: persisted.map_or(&empty_plugins, |s| &s.suppress_plugins),
        update_mode: ctx.update_suppressions,
    });

    let legacy = &descriptor.legacy_depends;
    let has_xi_dependencies = !descriptor.xi_include_module_dependencies.is_empty()
        || !descriptor.xi_include_plugin_dependencies.is_empty();
    let remove_legacy_depends = !legacy.is_empty()
        && (descriptor.has_dependencies_section
            || has_xi_dependencies
            || plugins.written != *legacy);

    let mut usages = modules.usages(id.as_str(), SuppressionType::PluginXmlModule);
    usages.extend(plugins.usages(id.as_str(), SuppressionType::PluginXmlPlugin));

    PluginDependencyPlan {
        plugin_id: id.clone(),
        descriptor_path: descriptor.path.clone(),
        descriptor_content: descriptor.content.clone(),
        module_dependencies: modules.written.into_iter().collect(),
        plugin_dependencies: plugins.written.into_iter().collect(),
        existing_module_dependencies: descriptor.module_dependencies.iter().cloned().collect(),
        existing_plugin_dependencies: descriptor.plugin_dependencies.iter().cloned().collect(),
        legacy_plugin_dependencies: legacy.iter().cloned().collect(),
        xi_include_module_dependencies: descriptor
            .xi_include_module_dependencies
            .iter()
            .cloned()
            .collect(),
        xi_include_plugin_dependencies: descriptor
            .xi_include_plugin_dependencies
            .iter()
            .cloned()
            .collect(),
        duplicate_declaration_plugin_ids: duplicates,
        suppressed_modules: modules.effective.into_iter().collect(),
        suppressed_plugins: plugins.effective.into_iter().collect(),
        suppression_usages: usages,
        filtered_embedded_dependencies: filtered_embedded.into_iter().collect(),
        remove_legacy_depends,
        missing_plugin_id,
        allow_missing_plugin_id_used,
        error,
    }
}
