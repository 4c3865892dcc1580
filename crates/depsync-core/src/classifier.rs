//! # Dependency Classifier
//!
//! Walks one entity's outgoing build edges and buckets them into module and
//! plugin dependencies.
//!
//! ## Algorithm
//!
//! For each edge of the entity's build target:
//! 1. Drop TEST/PROVIDED edges unless test scope is included
//! 2. Classify the target (`ModuleDep`, `PluginDep`, `Skip`)
//! 3. Drop library modules rejected by the library predicate
//! 4. Record globally embedded modules as filtered instead of adding them
//! 5. Add everything else; plugin dependencies skip the embedding filter
//! 6. Keep `Skip` targets aside as unclassified

use crate::embedding::{
    should_skip_embedded_content_dependency, should_skip_embedded_plugin_dependency,
};
use crate::graph::{GraphQuery, PluginNode};
use crate::library::{LibraryFilter, admits};
use crate::types::{Classification, ContentModuleName, PluginId, TargetName};
use std::collections::BTreeSet;

/// The entity whose edges are being classified.
#[derive(Debug, Clone, Copy)]
pub enum DependencySource<'a> {
    ContentModule(&'a ContentModuleName),
    Plugin(&'a PluginNode),
}

/// Output of one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedDependencies {
    pub modules: BTreeSet<ContentModuleName>,
    pub plugins: BTreeSet<PluginId>,
    /// Module dependencies dropped by the embedding rule.
    pub filtered_embedded: BTreeSet<ContentModuleName>,
    /// Visible targets that back neither a module nor a plugin.
    pub unclassified: BTreeSet<TargetName>,
}

/// Classify the outgoing edges of `target` on behalf of `source`.
///
/// Self-references never survive: a module does not depend on itself, and a
/// plugin depends neither on itself nor on its own content modules.
pub fn classify_dependencies<G: GraphQuery + ?Sized>(
    graph: &G,
    source: DependencySource<'_>,
    target: &TargetName,
    include_test_scope: bool,
    libraries: &dyn LibraryFilter,
) -> ClassifiedDependencies {
    let own_content = match source {
        DependencySource::Plugin(plugin) => graph.plugin_content(&plugin.id),
        DependencySource::ContentModule(_) => BTreeSet::new(),
    };

    let mut result = ClassifiedDependencies::default();
    for edge in graph.depends_on(target) {
        if !edge.scope.is_visible(include_test_scope) {
            continue;
        }
        match graph.classify_target(&edge.target) {
            Classification::ModuleDep(module) => {
                let is_self = match source {
                    DependencySource::ContentModule(name) => *name == module,
                    DependencySource::Plugin(_) => own_content.contains(&module),
                };
                if is_self || !admits(libraries, &module) {
                    continue;
                }
                let embedded = match source {
                    DependencySource::ContentModule(name) => {
                        should_skip_embedded_content_dependency(graph, name, &module)
                    }
                    DependencySource::Plugin(_) => {
                        should_skip_embedded_plugin_dependency(graph, &module)
                    }
                };
                if embedded {
                    result.filtered_embedded.insert(module);
                } else {
                    result.modules.insert(module);
                }
            }
            Classification::PluginDep(plugin) => {
                let is_self = match source {
                    DependencySource::Plugin(own) => own.is_named(&plugin),
                    DependencySource::ContentModule(_) => false,
                };
                if !is_self {
                    result.plugins.insert(plugin);
                }
            }
            Classification::Skip => {
                result.unclassified.insert(edge.target.clone());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyGraph, PluginKind};
    use crate::library::{AllowAllLibraries, LibraryAllowList};
    use crate::types::{ContentSource, DependencyScope, ModuleLoading, RawDependency};

    fn graph() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph
            .add_target(
                TargetName::new("m"),
                vec![
                    RawDependency::new("n", DependencyScope::Compile),
                    RawDependency::new("t", DependencyScope::Test),
                    RawDependency::new("p", DependencyScope::Provided),
                    RawDependency::new("m", DependencyScope::Compile),
                    RawDependency::new("core", DependencyScope::Runtime),
                    RawDependency::new("intellij.libraries.guava", DependencyScope::Compile),
                    RawDependency::new("other.plugin.main", DependencyScope::Compile),
                    RawDependency::new("jar.only", DependencyScope::Compile),
                ],
            )
            .expect("target m");
        graph
            .add_target(
                TargetName::new("plugin.main"),
                vec![
                    RawDependency::new("m", DependencyScope::Compile),
                    RawDependency::new("n", DependencyScope::Compile),
                    RawDependency::new("core", DependencyScope::Compile),
                    RawDependency::new("plugin.main", DependencyScope::Compile),
                    RawDependency::new("other.plugin.main", DependencyScope::Compile),
                ],
            )
            .expect("plugin target");
        for (id, target) in [("com.self", "plugin.main"), ("com.other", "other.plugin.main")] {
            graph
                .add_plugin(PluginNode {
                    id: PluginId::new(id),
                    aliases: BTreeSet::new(),
                    primary_target: Some(TargetName::new(target)),
                    kind: PluginKind::Production,
                })
                .expect("plugin");
        }
        let plugin_source = || vec![ContentSource::plugin("com.self", ModuleLoading::Optional)];
        for name in ["m", "n", "t", "p", "intellij.libraries.guava"] {
            let sources = if name == "m" {
                plugin_source()
            } else {
                vec![ContentSource::product("IDEA", ModuleLoading::Required)]
            };
            graph
                .add_content_module(
                    ContentModuleName::new(name),
                    Some(TargetName::new(name)),
                    sources,
                )
                .expect("module");
        }
        graph
            .add_content_module(
                ContentModuleName::new("core"),
                Some(TargetName::new("core")),
                vec![ContentSource::product("IDEA", ModuleLoading::Embedded)],
            )
            .expect("core");
        graph
    }

    fn names(set: &BTreeSet<ContentModuleName>) -> Vec<&str> {
        set.iter().map(ContentModuleName::as_str).collect()
    }

    #[test]
    fn production_view_drops_test_and_provided() {
        let graph = graph();
        let m = ContentModuleName::new("m");
        let result = classify_dependencies(
            &graph,
            DependencySource::ContentModule(&m),
            &TargetName::new("m"),
            false,
            &AllowAllLibraries,
        );
        assert_eq!(names(&result.modules), vec!["intellij.libraries.guava", "n"]);
        assert_eq!(names(&result.filtered_embedded), vec!["core"]);
        assert!(result.plugins.contains("com.other"));
        assert_eq!(
            result.unclassified.into_iter().collect::<Vec<_>>(),
            vec![TargetName::new("jar.only")]
        );
    }

    #[test]
    fn test_view_includes_test_and_provided() {
        let graph = graph();
        let m = ContentModuleName::new("m");
        let result = classify_dependencies(
            &graph,
            DependencySource::ContentModule(&m),
            &TargetName::new("m"),
            true,
            &AllowAllLibraries,
        );
        assert_eq!(
            names(&result.modules),
            vec!["intellij.libraries.guava", "n", "p", "t"]
        );
    }

    #[test]
    fn library_predicate_rejects_libraries() {
        let graph = graph();
        let m = ContentModuleName::new("m");
        let deny = LibraryAllowList::new([], [ContentModuleName::new("intellij.libraries.guava")]);
        let result = classify_dependencies(
            &graph,
            DependencySource::ContentModule(&m),
            &TargetName::new("m"),
            false,
            &deny,
        );
        assert_eq!(names(&result.modules), vec!["n"]);
    }

    #[test]
    fn plugin_drops_own_content_and_itself() {
        let graph = graph();
        let plugin = graph.plugin(&PluginId::new("com.self")).expect("plugin").clone();
        let result = classify_dependencies(
            &graph,
            DependencySource::Plugin(&plugin),
            &TargetName::new("plugin.main"),
            false,
            &AllowAllLibraries,
        );
        assert_eq!(names(&result.modules), vec!["n"]);
        assert_eq!(names(&result.filtered_embedded), vec!["core"]);
        assert_eq!(
            result.plugins.into_iter().collect::<Vec<_>>(),
            vec![PluginId::new("com.other")]
        );
    }

    #[test]
    fn plugin_drops_content_listed_under_an_alias() {
        let mut graph = DependencyGraph::new();
        graph
            .add_target(
                TargetName::new("main.target"),
                vec![
                    RawDependency::new("own", DependencyScope::Compile),
                    RawDependency::new("shared", DependencyScope::Compile),
                ],
            )
            .expect("target");
        // The module source names the plugin before the plugin node exists.
        graph
            .add_content_module(
                ContentModuleName::new("own"),
                Some(TargetName::new("own")),
                vec![ContentSource::plugin("com.main.alias", ModuleLoading::Required)],
            )
            .expect("own");
        graph
            .add_content_module(
                ContentModuleName::new("shared"),
                Some(TargetName::new("shared")),
                vec![ContentSource::product("IDEA", ModuleLoading::Required)],
            )
            .expect("shared");
        graph
            .add_plugin(PluginNode {
                id: PluginId::new("com.main"),
                aliases: [PluginId::new("com.main.alias")].into_iter().collect(),
                primary_target: Some(TargetName::new("main.target")),
                kind: PluginKind::Production,
            })
            .expect("plugin");

        let plugin = graph.plugin(&PluginId::new("com.main")).expect("plugin").clone();
        let result = classify_dependencies(
            &graph,
            DependencySource::Plugin(&plugin),
            &TargetName::new("main.target"),
            false,
            &AllowAllLibraries,
        );
        assert_eq!(names(&result.modules), vec!["shared"]);
    }
}
