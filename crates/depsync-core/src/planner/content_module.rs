//! # Content-Module Planner
//!
//! One pass per content module, no retries:
//!
//! ```text
//! Start -> slash notation?        -> skipped
//!       -> descriptor missing?    -> skipped with MissingDescriptor
//!       -> non-standard root?     -> passthrough plan with error
//!       -> production view -> test view
//!       -> ledger(production) -> ledger(test, suppressions only)
//!       -> plan
//! ```
//!
//! After every plan is computed the derived edges are written back into the
//! graph in a single snapshot swap.

use crate::classifier::{ClassifiedDependencies, DependencySource, classify_dependencies};
use crate::descriptor::{DescriptorRoot, DescriptorSnapshot};
use crate::graph::{DependencyGraph, DependencyView, GraphQuery};
use crate::planner::{PlanningContext, fan_out};
use crate::store::GraphStore;
use crate::suppression::{LedgerInput, SuppressionLedger, SuppressionType, SuppressionUsage};
use crate::types::{
    ContentModuleName, DepsyncError, PipelineError, PipelineErrorKind, PluginId, TargetName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Immutable dependency plan of one content module.
///
/// Every list is sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPlan {
    pub name: ContentModuleName,
    pub descriptor_path: String,
    /// Descriptor content as read; the writer derives new content from it.
    pub descriptor_content: String,
    /// Production view, written to the descriptor.
    pub module_dependencies: Vec<ContentModuleName>,
    /// Production view, written to the descriptor.
    pub plugin_dependencies: Vec<PluginId>,
    /// Production plus test-only module dependencies. Never written.
    pub test_dependencies: Vec<ContentModuleName>,
    pub existing_xml_module_dependencies: Vec<ContentModuleName>,
    pub existing_xml_plugin_dependencies: Vec<PluginId>,
    pub suppressed_modules: Vec<ContentModuleName>,
    pub suppressed_plugins: Vec<PluginId>,
    pub suppression_usages: Vec<SuppressionUsage>,
    /// Dependencies dropped because the product guarantees them.
    pub filtered_embedded_dependencies: Vec<ContentModuleName>,
    /// Declared module dependencies the graph no longer explains and no
    /// suppression keeps.
    pub unexplained_removals: Vec<ContentModuleName>,
    pub error: Option<PipelineError>,
}

impl DependencyPlan {
    fn passthrough(
        name: ContentModuleName,
        descriptor: &DescriptorSnapshot,
        error: PipelineError,
    ) -> Self {
        Self {
            name,
            descriptor_path: descriptor.path.clone(),
            descriptor_content: descriptor.content.clone(),
            module_dependencies: Vec::new(),
            plugin_dependencies: Vec::new(),
            test_dependencies: Vec::new(),
            existing_xml_module_dependencies: descriptor
                .module_dependencies
                .iter()
                .cloned()
                .collect(),
            existing_xml_plugin_dependencies: descriptor
                .plugin_dependencies
                .iter()
                .cloned()
                .collect(),
            suppressed_modules: Vec::new(),
            suppressed_plugins: Vec::new(),
            suppression_usages: Vec::new(),
            filtered_embedded_dependencies: Vec::new(),
            unexplained_removals: Vec::new(),
            error: Some(error),
        }
    }

    /// Whether the generated dependencies differ from the declared ones.
    #[must_use]
    pub fn changes_descriptor(&self) -> bool {
        self.error.is_none()
            && (self.module_dependencies != self.existing_xml_module_dependencies
                || self.plugin_dependencies != self.existing_xml_plugin_dependencies)
    }
}

/// Output of one content-module planning pass.
#[derive(Debug, Clone, Default)]
pub struct ContentModulePlanning {
    /// Sorted by module name.
    pub plans: Vec<DependencyPlan>,
    /// Suppressible errors, sorted by key.
    pub errors: Vec<PipelineError>,
    /// Slash-notation modules, sorted.
    pub skipped: Vec<ContentModuleName>,
}

enum ModuleOutcome {
    Planned(Box<DependencyPlan>),
    Skipped(ContentModuleName),
    Failed(PipelineError),
}

/// Plan every in-scope content module, then write the derived edges back.
///
/// The snapshot is taken once; the write-back replaces it wholesale.
pub async fn plan_content_modules(
    store: &GraphStore,
    ctx: &PlanningContext,
) -> Result<ContentModulePlanning, DepsyncError> {
    let graph = store.snapshot();
    let names: Vec<ContentModuleName> = graph
        .content_modules()
        .filter(|module| !module.is_orphan() && ctx.scope.includes_module(&module.name))
        .map(|module| module.name.clone())
        .collect();
    tracing::debug!(modules = names.len(), "planning content modules");

    let task_ctx = ctx.clone();
    let task_graph = Arc::clone(&graph);
    let outcomes = fan_out(names, ctx.concurrency, move |name| {
        plan_content_module(task_graph.as_ref(), &task_ctx, name)
    })
    .await?;

    let mut planning = ContentModulePlanning::default();
    for outcome in outcomes {
        match outcome {
            ModuleOutcome::Planned(plan) => {
                if let Some(error) = &plan.error {
                    planning.errors.push(error.clone());
                }
                planning.plans.push(*plan);
            }
            ModuleOutcome::Skipped(name) => planning.skipped.push(name),
            ModuleOutcome::Failed(error) => planning.errors.push(error),
        }
    }
    planning.plans.sort_by(|a, b| a.name.cmp(&b.name));
    planning.errors.sort();
    planning.skipped.sort();

    write_back(store, &planning.plans)?;

    tracing::info!(
        plans = planning.plans.len(),
        skipped = planning.skipped.len(),
        errors = planning.errors.len(),
        "content module planning complete"
    );
    Ok(planning)
}

fn plan_content_module(
    graph: &DependencyGraph,
    ctx: &PlanningContext,
    name: ContentModuleName,
) -> ModuleOutcome {
    if name.is_slash_notation() {
        tracing::debug!(module = %name, "skipping slash-notation module");
        return ModuleOutcome::Skipped(name);
    }

    let Some(descriptor) = ctx.descriptors.module_descriptor(&name) else {
        let error = PipelineError::new(
            &name,
            PipelineErrorKind::MissingDescriptor,
            "no descriptor snapshot for content module",
        );
        tracing::warn!(module = %name, "{error}");
        return ModuleOutcome::Failed(error);
    };

    if let DescriptorRoot::NonStandard(root) = &descriptor.root {
        let error = PipelineError::new(
            &name,
            PipelineErrorKind::NonStandardDescriptorRoot,
            format!("descriptor root <{root}> is not supported; passed through untouched"),
        );
        tracing::warn!(module = %name, "{error}");
        return ModuleOutcome::Planned(Box::new(DependencyPlan::passthrough(
            name,
            &descriptor,
            error,
        )));
    }

    let (production, test) = match graph.content_module(&name).and_then(|m| m.target.as_ref()) {
        Some(target) => compute_views(graph, ctx, &name, target),
        None => (ClassifiedDependencies::default(), ClassifiedDependencies::default()),
    };

    ModuleOutcome::Planned(Box::new(assemble_plan(ctx, name, &descriptor, production, test)))
}

/// Production view and always-test-inclusive view of one module.
fn compute_views(
    graph: &DependencyGraph,
    ctx: &PlanningContext,
    name: &ContentModuleName,
    target: &TargetName,
) -> (ClassifiedDependencies, ClassifiedDependencies) {
    let source = DependencySource::ContentModule(name);
    let libraries = ctx.libraries.as_ref();
    let production =
        classify_dependencies(graph, source, target, name.is_test_descriptor(), libraries);
    let test = classify_dependencies(graph, source, target, true, libraries);
    (production, test)
}

fn assemble_plan(
    ctx: &PlanningContext,
    name: ContentModuleName,
    descriptor: &DescriptorSnapshot,
    production: ClassifiedDependencies,
    test: ClassifiedDependencies,
) -> DependencyPlan {
    let empty_modules = BTreeSet::new();
    let empty_plugins = BTreeSet::new();
    let persisted = ctx.suppressions.content_module(&name);
    let persisted_modules = persisted.map_or(&empty_modules, |s| &s.suppress_modules);
    let persisted_plugins = persisted.map_or(&empty_plugins, |s| &s.suppress_plugins);

    let modules = SuppressionLedger::apply(LedgerInput {
        computed: &production.modules,
        existing: &descriptor.module_dependencies,
        persisted: persisted_modules,
        update_mode: ctx.update_suppressions,
    });
    let plugins = SuppressionLedger::apply(LedgerInput {
        computed: &production.plugins,
        existing: &descriptor.plugin_dependencies,
        persisted: persisted_plugins,
        update_mode: ctx.update_suppressions,
    });
    // The test view only replays the production suppressions; it never
    // captures drift of its own.
    let test_modules = SuppressionLedger::apply(LedgerInput {
        computed: &test.modules,
        existing: &descriptor.module_dependencies,
        persisted: &modules.effective,
        update_mode: false,
    });

    let mut usages = modules.usages(name.as_str(), SuppressionType::ModuleDep);
    usages.extend(plugins.usages(name.as_str(), SuppressionType::PluginDep));
    usages.extend(test_modules.usages_outside(name.as_str(), SuppressionType::ModuleDep, &modules));

    let test_dependencies: BTreeSet<ContentModuleName> = test_modules
        .written
        .iter()
        .chain(modules.written.iter())
        .cloned()
        .collect();
    let filtered_embedded: BTreeSet<&ContentModuleName> = production
        .filtered_embedded
        .iter()
        .chain(test.filtered_embedded.iter())
        .collect();
    let unexplained_removals: Vec<ContentModuleName> = modules
        .unexplained_removals
        .iter()
        .filter(|m| !filtered_embedded.contains(m))
        .cloned()
        .collect();

    if !unexplained_removals.is_empty() {
        tracing::debug!(
            module = %name,
            removals = unexplained_removals.len(),
            "declared dependencies no longer explained by the graph"
        );
    }

    DependencyPlan {
        descriptor_path: descriptor.path.clone(),
        descriptor_content: descriptor.content.clone(),
        module_dependencies: modules.written.into_iter().collect(),
        plugin_dependencies: plugins.written.into_iter().collect(),
        test_dependencies: test_dependencies.into_iter().collect(),
        existing_xml_module_dependencies: descriptor.module_dependencies.iter().cloned().collect(),
        existing_xml_plugin_dependencies: descriptor.plugin_dependencies.iter().cloned().collect(),
        suppressed_modules: modules.effective.into_iter().collect(),
        suppressed_plugins: plugins.effective.into_iter().collect(),
        suppression_usages: usages,
        filtered_embedded_dependencies: filtered_embedded.into_iter().cloned().collect(),
        unexplained_removals,
        error: None,
        name,
    }
}

/// Add orphan nodes for unknown targets, then both edge views, in one swap.
fn write_back(store: &GraphStore, plans: &[DependencyPlan]) -> Result<(), DepsyncError> {
    let next = store.replace_with(|graph| {
        for plan in plans.iter().filter(|plan| plan.error.is_none()) {
            for dependency in plan.module_dependencies.iter().chain(&plan.test_dependencies) {
                if graph.content_module(dependency).is_none() {
                    tracing::debug!(
                        module = %plan.name,
                        dependency = %dependency,
                        "adding orphan module"
                    );
                    graph.add_orphan_module(dependency.clone())?;
                }
            }
        }
        for plan in plans.iter().filter(|plan| plan.error.is_none()) {
            for dependency in &plan.module_dependencies {
                graph.add_module_edge(DependencyView::Production, &plan.name, dependency)?;
            }
            for dependency in &plan.test_dependencies {
                graph.add_module_edge(DependencyView::Test, &plan.name, dependency)?;
            }
        }
        Ok(())
    })?;
    tracing::debug!(
        production_edges = next.edge_count(DependencyView::Production),
        test_edges = next.edge_count(DependencyView::Test),
        "graph write-back complete"
    );
    Ok(())
}
