//! # Dependency Graph
//!
//! The graph snapshot every planner reads from.
//!
//! Nodes live in a flat arena keyed by `NodeId`; name indices map
//! identifiers to ids. Ids are never reused, so they stay stable across
//! snapshot swaps except for newly appended orphan nodes.
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering.

use crate::types::{
    Classification, ContentModuleName, ContentSource, ContentSourceKind, DepsyncError, PluginId,
    RawDependency, TargetName,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPH QUERY FACADE
// =============================================================================

/// Read-only queries the classifiers and planners run against a snapshot.
///
/// Every consumer receives the snapshot explicitly; there is no ambient graph.
pub trait GraphQuery {
    /// Outgoing raw dependencies of a build target (empty for unknown targets).
    fn depends_on(&self, target: &TargetName) -> &[RawDependency];

    /// Classify a dependency target into a module dependency, a plugin
    /// dependency, or nothing.
    fn classify_target(&self, target: &TargetName) -> Classification;

    /// Look up a content module by name.
    fn content_module(&self, name: &ContentModuleName) -> Option<&ContentModuleNode>;

    /// Plugins (of any kind) that declare the module in their content, sorted.
    fn plugin_owners(&self, module: &ContentModuleName) -> Vec<PluginId>;

    /// Look up a plugin by id or alias.
    fn plugin(&self, id: &PluginId) -> Option<&PluginNode>;

    /// Content modules declared by a plugin under its id or any alias.
    fn plugin_content(&self, id: &PluginId) -> BTreeSet<ContentModuleName>;

    /// Look up a product by name.
    fn product(&self, name: &str) -> Option<&Product>;

    /// Library module that replaces a raw project-library target, if any.
    fn library_replacement(&self, target: &TargetName) -> Option<&ContentModuleName>;
}

// =============================================================================
// NODES
// =============================================================================

/// Unique identifier for a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// A build target with its outgoing raw dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetNode {
    pub name: TargetName,
    pub dependencies: Vec<RawDependency>,
}

/// A content module and the content-source edges that declare it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentModuleNode {
    pub name: ContentModuleName,
    /// Build target backing the module (`None` for slash-notation and orphan modules).
    pub target: Option<TargetName>,
    pub sources: Vec<ContentSource>,
}

impl ContentModuleNode {
    /// Sources that are products or module sets.
    pub fn non_plugin_sources(&self) -> impl Iterator<Item = &ContentSource> {
        self.sources.iter().filter(|s| !s.source.is_plugin())
    }

    /// A module without any content source was added during write-back.
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.sources.is_empty()
    }
}

/// How a plugin came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// A regular plugin backed by a primary build target.
    #[default]
    Production,
    /// A plugin generated purely from a DSL spec; it has no build-level
    /// dependencies to mine.
    DslGenerated,
    /// A synthetic DSL-declared test plugin.
    Test,
}

/// A plugin node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginNode {
    pub id: PluginId,
    pub aliases: BTreeSet<PluginId>,
    pub primary_target: Option<TargetName>,
    pub kind: PluginKind,
}

impl PluginNode {
    /// The id followed by every alias, sorted and deduplicated.
    #[must_use]
    pub fn known_ids(&self) -> Vec<PluginId> {
        let mut ids: BTreeSet<PluginId> = self.aliases.clone();
        ids.insert(self.id.clone());
        ids.into_iter().collect()
    }

    /// Whether `id` names this plugin (directly or through an alias).
    #[must_use]
    pub fn is_named(&self, id: &PluginId) -> bool {
        &self.id == id || self.aliases.contains(id)
    }
}

/// Payload of an arena node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    ContentModule(ContentModuleNode),
    Plugin(PluginNode),
    Target(TargetNode),
}

/// A product: the set of plugins it bundles and the module sets it includes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub bundled_plugins: BTreeSet<PluginId>,
    #[serde(default)]
    pub module_sets: BTreeSet<String>,
}

/// A synthetic test plugin declared through the product DSL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPluginSpec {
    pub plugin_id: PluginId,
    /// Product under test; decides which plugins are reachable.
    pub product: String,
    #[serde(default)]
    pub content_modules: BTreeSet<ContentModuleName>,
    /// Plugin ids the test plugin may omit for every module.
    #[serde(default)]
    pub allowed_missing_plugin_ids: BTreeSet<PluginId>,
    /// Plugin ids a specific module may omit.
    #[serde(default)]
    pub module_allowed_missing_plugin_ids: BTreeMap<ContentModuleName, BTreeSet<PluginId>>,
    /// module -> module that first pulled it into the test plugin.
    #[serde(default)]
    pub dependency_chain: BTreeMap<ContentModuleName, ContentModuleName>,
}

/// Which dependency view an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DependencyView {
    /// The view written to descriptors.
    Production,
    /// Production plus test-only dependencies, used by validators.
    Test,
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The dependency graph snapshot.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node arena: NodeId -> Node
    nodes: BTreeMap<NodeId, Node>,

    /// Name indices
    targets: BTreeMap<TargetName, NodeId>,
    modules: BTreeMap<ContentModuleName, NodeId>,
    /// Plugin ids and aliases -> plugin node
    plugins: BTreeMap<PluginId, NodeId>,

    /// Target -> the content module / plugin it backs
    module_by_target: BTreeMap<TargetName, ContentModuleName>,
    plugin_by_target: BTreeMap<TargetName, PluginId>,

    /// Reverse of plugin content-source edges: plugin -> modules
    plugin_content: BTreeMap<PluginId, BTreeSet<ContentModuleName>>,

    products: BTreeMap<String, Product>,
    test_plugins: BTreeMap<PluginId, TestPluginSpec>,
    library_replacements: BTreeMap<TargetName, ContentModuleName>,

    /// Written back by the content-module planner: from -> to
    production_edges: BTreeMap<NodeId, BTreeSet<NodeId>>,
    test_edges: BTreeMap<NodeId, BTreeSet<NodeId>>,

    /// Next available NodeId
    next_node_id: u64,
}

impl DependencyGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id = self.next_node_id.saturating_add(1);
        self.nodes.insert(id, node);
        id
    }

    /// Add a build target with its outgoing dependencies.
    pub fn add_target(
        &mut self,
        name: TargetName,
        mut dependencies: Vec<RawDependency>,
    ) -> Result<NodeId, DepsyncError> {
        if !name.is_valid() {
            return Err(DepsyncError::EmptyName("target"));
        }
        if self.targets.contains_key(&name) {
            return Err(DepsyncError::DuplicateNode {
                kind: "target",
                name: name.to_string(),
            });
        }
        if dependencies.iter().any(|d| !d.target.is_valid()) {
            return Err(DepsyncError::EmptyName("dependency target"));
        }
        dependencies.sort();
        dependencies.dedup();
        let id = self.allocate(Node::Target(TargetNode {
            name: name.clone(),
            dependencies,
        }));
        self.targets.insert(name, id);
        Ok(id)
    }

    /// Add a plugin. Aliases resolve to the same node.
    pub fn add_plugin(&mut self, plugin: PluginNode) -> Result<NodeId, DepsyncError> {
        if !plugin.id.is_valid() {
            return Err(DepsyncError::EmptyName("plugin"));
        }
        for id in plugin.known_ids() {
            if self.plugins.contains_key(&id) {
                return Err(DepsyncError::DuplicateNode {
                    kind: "plugin",
                    name: id.to_string(),
                });
            }
        }
        let known_ids = plugin.known_ids();
        let canonical = plugin.id.clone();
        let primary_target = plugin.primary_target.clone();
        let id = self.allocate(Node::Plugin(plugin));
        for known in known_ids {
            self.plugins.insert(known, id);
        }
        if let Some(target) = primary_target {
            self.plugin_by_target.insert(target, canonical);
        }
        Ok(id)
    }

    /// Add a content module with its content-source edges.
    pub fn add_content_module(
        &mut self,
        name: ContentModuleName,
        target: Option<TargetName>,
        mut sources: Vec<ContentSource>,
    ) -> Result<NodeId, DepsyncError> {
        if !name.is_valid() {
            return Err(DepsyncError::EmptyName("content module"));
        }
        if self.modules.contains_key(&name) {
            return Err(DepsyncError::DuplicateNode {
                kind: "content module",
                name: name.to_string(),
            });
        }
        sources.sort();
        sources.dedup();

        for source in &sources {
            if let ContentSourceKind::Plugin(owner) = &source.source {
                self.plugin_content
                    .entry(owner.clone())
                    .or_default()
                    .insert(name.clone());
            }
        }
        if let Some(target) = &target {
            self.module_by_target
                .entry(target.clone())
                .or_insert_with(|| name.clone());
        }

        let id = self.allocate(Node::ContentModule(ContentModuleNode {
            name: name.clone(),
            target,
            sources,
        }));
        self.modules.insert(name, id);
        Ok(id)
    }

    /// Add a content module that no content source declares.
    ///
    /// Used by write-back for dependency targets unknown to the graph so a
    /// downstream validator can flag them.
    pub fn add_orphan_module(&mut self, name: ContentModuleName) -> Result<NodeId, DepsyncError> {
        if let Some(&id) = self.modules.get(&name) {
            return Ok(id);
        }
        self.add_content_module(name, None, Vec::new())
    }

    /// Add or replace a product.
    pub fn add_product(&mut self, product: Product) -> Result<(), DepsyncError> {
        if product.name.is_empty() {
            return Err(DepsyncError::EmptyName("product"));
        }
        self.products.insert(product.name.clone(), product);
        Ok(())
    }

    /// Add a DSL-declared test plugin; creates its plugin node if missing.
    pub fn add_test_plugin(&mut self, spec: TestPluginSpec) -> Result<(), DepsyncError> {
        if !self.plugins.contains_key(&spec.plugin_id) {
            self.add_plugin(PluginNode {
                id: spec.plugin_id.clone(),
                aliases: BTreeSet::new(),
                primary_target: None,
                kind: PluginKind::Test,
            })?;
        }
        self.test_plugins.insert(spec.plugin_id.clone(), spec);
        Ok(())
    }

    /// Register a library module that replaces a raw project library target.
    pub fn add_library_replacement(&mut self, library: TargetName, module: ContentModuleName) {
        self.library_replacements.insert(library, module);
    }

    /// Add a derived module-to-module edge for a dependency view.
    ///
    /// Both endpoints must exist; a missing endpoint is a logic error in the
    /// caller and is reported as `NodeNotFound`.
    pub fn add_module_edge(
        &mut self,
        view: DependencyView,
        from: &ContentModuleName,
        to: &ContentModuleName,
    ) -> Result<(), DepsyncError> {
        let from_id = *self
            .modules
            .get(from)
            .ok_or_else(|| DepsyncError::NodeNotFound(from.to_string()))?;
        let to_id = *self
            .modules
            .get(to)
            .ok_or_else(|| DepsyncError::NodeNotFound(to.to_string()))?;
        let edges = match view {
            DependencyView::Production => &mut self.production_edges,
            DependencyView::Test => &mut self.test_edges,
        };
        edges.entry(from_id).or_default().insert(to_id);
        Ok(())
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// All plugins (once each, aliases folded) in NodeId order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginNode> {
        self.nodes.values().filter_map(|node| match node {
            Node::Plugin(plugin) => Some(plugin),
            Node::ContentModule(_) | Node::Target(_) => None,
        })
    }

    /// All targets in NodeId order.
    pub fn targets(&self) -> impl Iterator<Item = &TargetNode> {
        self.nodes.values().filter_map(|node| match node {
            Node::Target(target) => Some(target),
            Node::ContentModule(_) | Node::Plugin(_) => None,
        })
    }

    /// All content modules in NodeId order.
    pub fn content_modules(&self) -> impl Iterator<Item = &ContentModuleNode> {
        self.nodes.values().filter_map(|node| match node {
            Node::ContentModule(module) => Some(module),
            Node::Plugin(_) | Node::Target(_) => None,
        })
    }

    /// All DSL-declared test plugins in id order.
    pub fn test_plugins(&self) -> impl Iterator<Item = &TestPluginSpec> {
        self.test_plugins.values()
    }

    /// All products in name order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of derived edges in a view.
    #[must_use]
    pub fn edge_count(&self, view: DependencyView) -> usize {
        let edges = match view {
            DependencyView::Production => &self.production_edges,
            DependencyView::Test => &self.test_edges,
        };
        edges.values().map(BTreeSet::len).sum()
    }

    /// Derived dependencies of a module in a view, sorted by name.
    #[must_use]
    pub fn module_dependencies(
        &self,
        view: DependencyView,
        module: &ContentModuleName,
    ) -> Vec<ContentModuleName> {
        let edges = match view {
            DependencyView::Production => &self.production_edges,
            DependencyView::Test => &self.test_edges,
        };
        let Some(id) = self.modules.get(module) else {
            return Vec::new();
        };
        let mut names: Vec<ContentModuleName> = edges
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|to| match self.nodes.get(to) {
                Some(Node::ContentModule(m)) => Some(m.name.clone()),
                _ => None,
            })
            .collect();
        names.sort();
        names
    }

    /// Whether `id` names a plugin bundled in `product` (aliases resolved).
    #[must_use]
    pub fn is_bundled(&self, product: &Product, id: &PluginId) -> bool {
        match self.plugin(id) {
            Some(plugin) => product.bundled_plugins.iter().any(|b| plugin.is_named(b)),
            None => product.bundled_plugins.contains(id),
        }
    }

    /// Library replacements in target order.
    #[must_use]
    pub fn library_replacements(&self) -> &BTreeMap<TargetName, ContentModuleName> {
        &self.library_replacements
    }
}

impl GraphQuery for DependencyGraph {
    fn depends_on(&self, target: &TargetName) -> &[RawDependency] {
        match self.targets.get(target).and_then(|id| self.nodes.get(id)) {
            Some(Node::Target(node)) => &node.dependencies,
            _ => &[],
        }
    }

    fn classify_target(&self, target: &TargetName) -> Classification {
        if let Some(module) = self.module_by_target.get(target) {
            return Classification::ModuleDep(module.clone());
        }
        if let Some(plugin) = self.plugin_by_target.get(target) {
            return Classification::PluginDep(plugin.clone());
        }
        Classification::Skip
    }

    fn content_module(&self, name: &ContentModuleName) -> Option<&ContentModuleNode> {
        match self.modules.get(name).and_then(|id| self.nodes.get(id)) {
            Some(Node::ContentModule(module)) => Some(module),
            _ => None,
        }
    }

    fn plugin_owners(&self, module: &ContentModuleName) -> Vec<PluginId> {
        let Some(node) = self.content_module(module) else {
            return Vec::new();
        };
        let owners: BTreeSet<PluginId> = node
            .sources
            .iter()
            .filter_map(|s| match &s.source {
                ContentSourceKind::Plugin(id) => Some(
                    self.plugin(id)
                        .map_or_else(|| id.clone(), |plugin| plugin.id.clone()),
                ),
                ContentSourceKind::Product(_) | ContentSourceKind::ModuleSet(_) => None,
            })
            .collect();
        owners.into_iter().collect()
    }

    fn plugin(&self, id: &PluginId) -> Option<&PluginNode> {
        match self.plugins.get(id).and_then(|node| self.nodes.get(node)) {
            Some(Node::Plugin(plugin)) => Some(plugin),
            _ => None,
        }
    }

    fn plugin_content(&self, id: &PluginId) -> BTreeSet<ContentModuleName> {
        // Sources may name the plugin by an alias, and may be added before it.
        let known = self
            .plugin(id)
            .map_or_else(|| vec![id.clone()], PluginNode::known_ids);
        known
            .iter()
            .filter_map(|known| self.plugin_content.get(known))
            .flatten()
            .cloned()
            .collect()
    }

    fn product(&self, name: &str) -> Option<&Product> {
        self.products.get(name)
    }

    fn library_replacement(&self, target: &TargetName) -> Option<&ContentModuleName> {
        self.library_replacements.get(target)
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// A build target as it appears in a graph document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDocument {
    pub name: TargetName,
    #[serde(default)]
    pub dependencies: Vec<RawDependency>,
}

/// A content module as it appears in a graph document.
///
/// A missing `target` defaults to the module's own name unless the module
/// uses slash notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentModuleDocument {
    pub name: ContentModuleName,
    #[serde(default)]
    pub target: Option<TargetName>,
    #[serde(default)]
    pub sources: Vec<ContentSource>,
}

/// A plugin as it appears in a graph document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDocument {
    pub id: PluginId,
    #[serde(default)]
    pub aliases: BTreeSet<PluginId>,
    #[serde(default)]
    pub primary_target: Option<TargetName>,
    #[serde(default)]
    pub kind: PluginKind,
}

/// Serializable representation of the graph input slot.
///
/// Derived write-back edges are not part of the document; they are
/// recomputed on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub targets: Vec<TargetDocument>,
    #[serde(default)]
    pub plugins: Vec<PluginDocument>,
    #[serde(default)]
    pub content_modules: Vec<ContentModuleDocument>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub test_plugins: Vec<TestPluginSpec>,
    #[serde(default)]
    pub library_replacements: BTreeMap<TargetName, ContentModuleName>,
}

impl TryFrom<GraphDocument> for DependencyGraph {
    type Error = DepsyncError;

    fn try_from(doc: GraphDocument) -> Result<Self, Self::Error> {
        let mut graph = Self::new();

        for target in doc.targets {
            graph.add_target(target.name, target.dependencies)?;
        }
        for plugin in doc.plugins {
            graph.add_plugin(PluginNode {
                id: plugin.id,
                aliases: plugin.aliases,
                primary_target: plugin.primary_target,
                kind: plugin.kind,
            })?;
        }
        for module in doc.content_modules {
            let target = module.target.or_else(|| {
                (!module.name.is_slash_notation()).then(|| TargetName::new(&module.name))
            });
            graph.add_content_module(module.name, target, module.sources)?;
        }
        for product in doc.products {
            graph.add_product(product)?;
        }
        for spec in doc.test_plugins {
            graph.add_test_plugin(spec)?;
        }
        for (library, module) in doc.library_replacements {
            graph.add_library_replacement(library, module);
        }

        Ok(graph)
    }
}

impl From<&DependencyGraph> for GraphDocument {
    fn from(graph: &DependencyGraph) -> Self {
        Self {
            targets: graph
                .targets()
                .map(|t| TargetDocument {
                    name: t.name.clone(),
                    dependencies: t.dependencies.clone(),
                })
                .collect(),
            plugins: graph
                .plugins()
                .map(|p| PluginDocument {
                    id: p.id.clone(),
                    aliases: p.aliases.clone(),
                    primary_target: p.primary_target.clone(),
                    kind: p.kind,
                })
                .collect(),
            content_modules: graph
                .content_modules()
                .map(|m| ContentModuleDocument {
                    name: m.name.clone(),
                    target: m.target.clone(),
                    sources: m.sources.clone(),
                })
                .collect(),
            products: graph.products().cloned().collect(),
            test_plugins: graph.test_plugins.values().cloned().collect(),
            library_replacements: graph.library_replacements.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DependencyScope, ModuleLoading};

    fn sample() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph
            .add_target(
                TargetName::new("a"),
                vec![
                    RawDependency::new("b", DependencyScope::Compile),
                    RawDependency::new("plugin.main", DependencyScope::Runtime),
                    RawDependency::new("b", DependencyScope::Compile),
                ],
            )
            .expect("target");
        graph
            .add_plugin(PluginNode {
                id: PluginId::new("com.p"),
                aliases: [PluginId::new("com.p.alias")].into_iter().collect(),
                primary_target: Some(TargetName::new("plugin.main")),
                kind: PluginKind::Production,
            })
            .expect("plugin");
        graph
            .add_content_module(
                ContentModuleName::new("a"),
                Some(TargetName::new("a")),
                vec![ContentSource::plugin("com.p", ModuleLoading::Required)],
            )
            .expect("module a");
        graph
            .add_content_module(
                ContentModuleName::new("b"),
                Some(TargetName::new("b")),
                vec![ContentSource::product("IDEA", ModuleLoading::Embedded)],
            )
            .expect("module b");
        graph
    }

    #[test]
    fn depends_on_is_sorted_and_deduplicated() {
        let graph = sample();
        let deps = graph.depends_on(&TargetName::new("a"));
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].target.as_str(), "b");
    }

    #[test]
    fn classify_target_distinguishes_kinds() {
        let graph = sample();
        assert_eq!(
            graph.classify_target(&TargetName::new("b")),
            Classification::ModuleDep(ContentModuleName::new("b"))
        );
        assert_eq!(
            graph.classify_target(&TargetName::new("plugin.main")),
            Classification::PluginDep(PluginId::new("com.p"))
        );
        assert_eq!(
            graph.classify_target(&TargetName::new("unknown")),
            Classification::Skip
        );
    }

    #[test]
    fn aliases_resolve_to_same_plugin() {
        let graph = sample();
        let by_alias = graph.plugin(&PluginId::new("com.p.alias")).expect("alias");
        assert_eq!(by_alias.id.as_str(), "com.p");
        assert_eq!(graph.plugins().count(), 1);
    }

    #[test]
    fn plugin_owners_come_from_content_sources() {
        let graph = sample();
        assert_eq!(
            graph.plugin_owners(&ContentModuleName::new("a")),
            vec![PluginId::new("com.p")]
        );
        assert!(graph.plugin_owners(&ContentModuleName::new("b")).is_empty());
    }

    #[test]
    fn plugin_content_folds_aliases() {
        let mut graph = sample();
        graph
            .add_content_module(
                ContentModuleName::new("c"),
                Some(TargetName::new("c")),
                vec![ContentSource::plugin("com.p.alias", ModuleLoading::Optional)],
            )
            .expect("module c");
        let expected: BTreeSet<ContentModuleName> =
            ["a", "c"].into_iter().map(ContentModuleName::new).collect();
        assert_eq!(graph.plugin_content(&PluginId::new("com.p")), expected);
        assert_eq!(graph.plugin_content(&PluginId::new("com.p.alias")), expected);
        assert!(graph.plugin_content(&PluginId::new("com.none")).is_empty());
    }

    #[test]
    fn duplicate_module_rejected() {
        let mut graph = sample();
        let result = graph.add_content_module(ContentModuleName::new("a"), None, Vec::new());
        assert!(matches!(result, Err(DepsyncError::DuplicateNode { .. })));
    }

    #[test]
    fn empty_names_rejected() {
        let mut graph = DependencyGraph::new();
        assert!(matches!(
            graph.add_target(TargetName::new(""), Vec::new()),
            Err(DepsyncError::EmptyName(_))
        ));
        assert!(matches!(
            graph.add_content_module(ContentModuleName::new(""), None, Vec::new()),
            Err(DepsyncError::EmptyName(_))
        ));
    }

    #[test]
    fn module_edge_requires_both_nodes() {
        let mut graph = sample();
        let result = graph.add_module_edge(
            DependencyView::Production,
            &ContentModuleName::new("a"),
            &ContentModuleName::new("missing"),
        );
        assert!(matches!(result, Err(DepsyncError::NodeNotFound(_))));

        graph
            .add_module_edge(
                DependencyView::Production,
                &ContentModuleName::new("a"),
                &ContentModuleName::new("b"),
            )
            .expect("edge");
        assert_eq!(graph.edge_count(DependencyView::Production), 1);
        assert_eq!(graph.edge_count(DependencyView::Test), 0);
        assert_eq!(
            graph.module_dependencies(DependencyView::Production, &ContentModuleName::new("a")),
            vec![ContentModuleName::new("b")]
        );
    }

    #[test]
    fn orphan_module_has_no_sources() {
        let mut graph = sample();
        let first = graph
            .add_orphan_module(ContentModuleName::new("ghost"))
            .expect("orphan");
        let second = graph
            .add_orphan_module(ContentModuleName::new("ghost"))
            .expect("orphan again");
        assert_eq!(first, second);
        let ghost = graph
            .content_module(&ContentModuleName::new("ghost"))
            .expect("ghost");
        assert!(ghost.is_orphan());
    }

    #[test]
    fn document_roundtrip_preserves_structure() {
        let graph = sample();
        let doc = GraphDocument::from(&graph);
        let restored = DependencyGraph::try_from(doc.clone()).expect("restore");
        assert_eq!(restored.node_count(), graph.node_count());
        assert_eq!(GraphDocument::from(&restored), doc);
    }

    #[test]
    fn document_defaults_module_target_to_its_name() {
        let doc = GraphDocument {
            content_modules: vec![
                ContentModuleDocument {
                    name: ContentModuleName::new("x"),
                    target: None,
                    sources: Vec::new(),
                },
                ContentModuleDocument {
                    name: ContentModuleName::new("x/extra"),
                    target: None,
                    sources: Vec::new(),
                },
            ],
            ..GraphDocument::default()
        };
        let graph = DependencyGraph::try_from(doc).expect("graph");
        let x = graph.content_module(&ContentModuleName::new("x")).expect("x");
        assert_eq!(x.target, Some(TargetName::new("x")));
        let slash = graph
            .content_module(&ContentModuleName::new("x/extra"))
            .expect("slash");
        assert_eq!(slash.target, None);
    }
}
