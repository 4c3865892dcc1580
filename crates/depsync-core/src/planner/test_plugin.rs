//! # Test-Plugin Dependency Planner
//!
//! Resolves dependencies of synthetic, DSL-declared test plugins.
//!
//! A module a test plugin uses may be owned by another, real plugin. That
//! plugin only counts if the product under test bundles it; otherwise the
//! dependency is reported as unresolved instead of being declared against
//! something that will never load.
//!
//! Edges come from the dependency classifier like for every other planner;
//! the resolved sets then go through the suppression ledger against the
//! test plugin's descriptor, when one exists.

use crate::classifier::{DependencySource, classify_dependencies};
use crate::embedding::is_globally_embedded;
use crate::graph::{DependencyGraph, GraphQuery, PluginKind, Product, TestPluginSpec};
use crate::planner::{PlanningContext, fan_out};
use crate::suppression::{LedgerInput, SuppressionLedger, SuppressionType, SuppressionUsage};
use crate::types::{ContentModuleName, ContentSourceKind, DepsyncError, PluginId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A dependency that could not be resolved for the product under test.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnresolvedDependency {
    /// A module owned by several plugins, none of them bundled.
    ContentModule {
        name: ContentModuleName,
        owning_plugins: Vec<PluginId>,
    },
    /// A plugin that is not bundled; `aliases` lists every id it is known by.
    Plugin { id: PluginId, aliases: Vec<PluginId> },
}

/// An unresolved dependency of one test plugin module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnresolvedEntry {
    /// The test plugin's module whose edge could not be satisfied.
    pub required_by: ContentModuleName,
    /// The module (or bare target) that edge points at.
    pub module: ContentModuleName,
    pub dependency: UnresolvedDependency,
}

/// Immutable dependency plan of one test plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPluginDependencyPlan {
    pub plugin_id: PluginId,
    pub product: String,
    /// Library modules declared directly.
    pub module_dependencies: Vec<ContentModuleName>,
    pub plugin_dependencies: Vec<PluginId>,
    /// plugin -> the modules that made it necessary
    pub required_by_plugin: BTreeMap<PluginId, Vec<ContentModuleName>>,
    pub unresolved_dependencies: Vec<UnresolvedEntry>,
    pub filtered_embedded_dependencies: Vec<ContentModuleName>,
    pub suppressed_modules: Vec<ContentModuleName>,
    pub suppressed_plugins: Vec<PluginId>,
    pub suppression_usages: Vec<SuppressionUsage>,
}

/// Plan every in-scope test plugin. Sorted by plugin id.
pub async fn plan_test_plugins(
    graph: Arc<DependencyGraph>,
    ctx: &PlanningContext,
) -> Result<Vec<TestPluginDependencyPlan>, DepsyncError> {
    let specs: Vec<TestPluginSpec> = graph
        .test_plugins()
        .filter(|spec| ctx.scope.includes_plugin(&spec.plugin_id))
        .cloned()
        .collect();

    let task_ctx = ctx.clone();
    let task_graph = Arc::clone(&graph);
    let mut plans = fan_out(specs, ctx.concurrency, move |spec| {
        TestPluginResolver::new(task_graph.as_ref(), &task_ctx, &spec).resolve()
    })
    .await?;
    plans.sort_by(|a, b| a.plugin_id.cmp(&b.plugin_id));

    let unresolved: usize = plans.iter().map(|p| p.unresolved_dependencies.len()).sum();
    if unresolved > 0 {
        tracing::warn!(unresolved, "test plugins have unresolved dependencies");
    }
    tracing::info!(plans = plans.len(), "test plugin planning complete");
    Ok(plans)
}

/// Per-test-plugin resolution state.
struct TestPluginResolver<'a> {
    graph: &'a DependencyGraph,
    ctx: &'a PlanningContext,
    spec: &'a TestPluginSpec,
    product: Product,
    modules: BTreeSet<ContentModuleName>,
    plugins: BTreeSet<PluginId>,
    required_by: BTreeMap<PluginId, BTreeSet<ContentModuleName>>,
    unresolved: BTreeSet<UnresolvedEntry>,
    filtered_embedded: BTreeSet<ContentModuleName>,
}

impl<'a> TestPluginResolver<'a> {
    fn new(graph: &'a DependencyGraph, ctx: &'a PlanningContext, spec: &'a TestPluginSpec) -> Self {
        // An unknown product bundles nothing; every external owner is unresolved.
        let product = graph.product(&spec.product).cloned().unwrap_or_else(|| {
            tracing::warn!(plugin = %spec.plugin_id, product = %spec.product, "unknown product");
            Product {
                name: spec.product.clone(),
                bundled_plugins: BTreeSet::new(),
                module_sets: BTreeSet::new(),
            }
        });
        Self {
            graph,
            ctx,
            spec,
            product,
            modules: BTreeSet::new(),
            plugins: BTreeSet::new(),
            required_by: BTreeMap::new(),
            unresolved: BTreeSet::new(),
            filtered_embedded: BTreeSet::new(),
        }
    }

    fn resolve(mut self) -> TestPluginDependencyPlan {
        let (graph, ctx, spec) = (self.graph, self.ctx, self.spec);
        for module in &spec.content_modules {
            let Some(target) = graph.content_module(module).and_then(|m| m.target.as_ref()) else {
                continue;
            };
            let classified = classify_dependencies(
                graph,
                DependencySource::ContentModule(module),
                target,
                module.is_test_descriptor(),
                ctx.libraries.as_ref(),
            );
            self.filtered_embedded.extend(classified.filtered_embedded);
            for dependency in classified.modules {
                self.resolve_module(module, dependency);
            }
            for plugin in classified.plugins {
                let named = graph
                    .plugin(&plugin)
                    .and_then(|node| node.primary_target.as_ref())
                    .map_or_else(|| ContentModuleName::new(&plugin), ContentModuleName::new);
                self.resolve_by_plugin_id(module, named, &plugin);
            }
            // A bare target only matters if it names a plugin.
            for raw in classified.unclassified {
                let id = PluginId::new(&raw);
                if graph.plugin(&id).is_some() {
                    self.resolve_by_plugin_id(module, ContentModuleName::new(&raw), &id);
                }
            }
        }
        self.into_plan()
    }

    fn resolve_module(&mut self, required_by: &ContentModuleName, dependency: ContentModuleName) {
        if self.spec.content_modules.contains(&dependency) {
            return;
        }
        if dependency.is_library() {
            if is_globally_embedded(self.graph, &dependency) {
                self.filtered_embedded.insert(dependency);
            } else {
                self.modules.insert(dependency);
            }
            return;
        }

        let owners: Vec<PluginId> = self
            .graph
            .plugin_owners(&dependency)
            .into_iter()
            .filter(|owner| self.graph.plugin(owner).is_none_or(|p| p.kind != PluginKind::Test))
            .collect();

        if owners.is_empty() {
            let as_plugin = PluginId::new(&dependency);
            if self.graph.plugin(&as_plugin).is_some() {
                self.resolve_by_plugin_id(required_by, dependency, &as_plugin);
            } else if !self.is_available_in_product(&dependency) {
                self.unresolved.insert(UnresolvedEntry {
                    required_by: required_by.clone(),
                    module: dependency.clone(),
                    dependency: UnresolvedDependency::ContentModule {
                        name: dependency,
                        owning_plugins: Vec::new(),
                    },
                });
            }
            return;
        }

        let allowed = self.allowed_missing(required_by);
        let bundled: Vec<&PluginId> = owners
            .iter()
            .filter(|owner| self.graph.is_bundled(&self.product, owner))
            .collect();

        if bundled.is_empty() {
            if owners.iter().all(|owner| self.is_allowed(&allowed, owner)) {
                return;
            }
            let diagnostic = match owners.as_slice() {
                [single] => self.plugin_diagnostic(single),
                _ => UnresolvedDependency::ContentModule {
                    name: dependency.clone(),
                    owning_plugins: owners.clone(),
                },
            };
            self.unresolved.insert(UnresolvedEntry {
                required_by: required_by.clone(),
                module: dependency,
                dependency: diagnostic,
            });
            return;
        }

        for owner in bundled {
            if *owner == self.spec.plugin_id || self.is_allowed(&allowed, owner) {
                continue;
            }
            self.add_plugin_dependency(owner.clone(), &dependency);
        }
    }

    /// `named` is the module or bare target the edge pointed at.
    fn resolve_by_plugin_id(
        &mut self,
        required_by: &ContentModuleName,
        named: ContentModuleName,
        id: &PluginId,
    ) {
        let canonical = self.graph.plugin(id).map_or_else(|| id.clone(), |p| p.id.clone());
        if canonical == self.spec.plugin_id {
            return;
        }
        if self.graph.is_bundled(&self.product, &canonical) {
            self.add_plugin_dependency(canonical, &named);
            return;
        }
        let allowed = self.allowed_missing(required_by);
        if !self.is_allowed(&allowed, &canonical) {
            let dependency = self.plugin_diagnostic(&canonical);
            self.unresolved.insert(UnresolvedEntry {
                required_by: required_by.clone(),
                module: named,
                dependency,
            });
        }
    }

    fn add_plugin_dependency(&mut self, plugin: PluginId, necessitated_by: &ContentModuleName) {
        self.required_by
            .entry(plugin.clone())
            .or_default()
            .insert(necessitated_by.clone());
        self.plugins.insert(plugin);
    }

    fn plugin_diagnostic(&self, id: &PluginId) -> UnresolvedDependency {
        let aliases = self
            .graph
            .plugin(id)
            .map_or_else(|| vec![id.clone()], |plugin| plugin.known_ids());
        UnresolvedDependency::Plugin {
            id: id.clone(),
            aliases,
        }
    }

    /// Declared directly in the product or in one of its module sets.
    fn is_available_in_product(&self, module: &ContentModuleName) -> bool {
        self.graph.content_module(module).is_some_and(|node| {
            node.sources.iter().any(|source| match &source.source {
                ContentSourceKind::Product(name) => *name == self.product.name,
                ContentSourceKind::ModuleSet(set) => self.product.module_sets.contains(set),
                ContentSourceKind::Plugin(_) => false,
            })
        })
    }

    /// Allowed missing plugin ids for a module, inherited along the
    /// dependency chain that pulled it into the test plugin.
    fn allowed_missing(&self, module: &ContentModuleName) -> BTreeSet<PluginId> {
        let mut allowed = self.spec.allowed_missing_plugin_ids.clone();
        let mut visited = BTreeSet::new();
        let mut current = Some(module);
        while let Some(name) = current {
            if !visited.insert(name) {
                break;
            }
            if let Some(ids) = self.spec.module_allowed_missing_plugin_ids.get(name) {
                allowed.extend(ids.iter().cloned());
            }
            current = self.spec.dependency_chain.get(name);
        }
        allowed
    }

    fn is_allowed(&self, allowed: &BTreeSet<PluginId>, id: &PluginId) -> bool {
        match self.graph.plugin(id) {
            Some(plugin) => plugin.known_ids().iter().any(|known| allowed.contains(known)),
            None => allowed.contains(id),
        }
    }

    /// Run the resolved sets through the suppression ledger.
    ///
    /// A test plugin without a descriptor has nothing declared to freeze, so
    /// update mode only replays the persisted suppressions for it.
    fn into_plan(self) -> TestPluginDependencyPlan {
        let id = &self.spec.plugin_id;
        let descriptor = self.ctx.descriptors.plugin_descriptor(id);
        let persisted = self.ctx.suppressions.plugin(id);
        let update_mode = self.ctx.update_suppressions && descriptor.is_some();

        let empty_modules = BTreeSet::new();
        let empty_plugins = BTreeSet::new();
        let modules = SuppressionLedger::apply(LedgerInput {
            computed: &self.modules,
            existing: descriptor.as_ref().map_or(&empty_modules, |d| &d.module_dependencies),
            persisted: persisted.map_or(&empty_modules, |s| &s.suppress_modules),
            update_mode,
        });
        let plugins = SuppressionLedger::apply(LedgerInput {
            computed: &self.plugins,
            existing: descriptor.as_ref().map_or(&empty_plugins, |d| &d.plugin_dependencies),
            persisted: persisted.map_or(&empty_plugins, |s| &s.suppress_plugins),
            update_mode,
        });

        let mut usages = modules.usages(id.as_str(), SuppressionType::PluginXmlModule);
        usages.extend(plugins.usages(id.as_str(), SuppressionType::PluginXmlPlugin));

        let required_by_plugin = self
            .required_by
            .into_iter()
            .filter(|(plugin, _)| plugins.written.contains(plugin))
            .map(|(plugin, modules)| (plugin, modules.into_iter().collect()))
            .collect();

        TestPluginDependencyPlan {
            plugin_id: id.clone(),
            product: self.spec.product.clone(),
            module_dependencies: modules.written.into_iter().collect(),
            plugin_dependencies: plugins.written.into_iter().collect(),
            required_by_plugin,
            unresolved_dependencies: self.unresolved.into_iter().collect(),
            filtered_embedded_dependencies: self.filtered_embedded.into_iter().collect(),
            suppressed_modules: modules.effective.into_iter().collect(),
            suppressed_plugins: plugins.effective.into_iter().collect(),
            suppression_usages: usages,
        }
    }
}
