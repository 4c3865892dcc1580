//! # Embedding Classifier
//!
//! Decides whether a content module is globally embedded (always loaded by
//! every product and module set that references it) and therefore exempt
//! from explicit dependency declarations.
//!
//! Pure queries over a graph snapshot.

use crate::graph::GraphQuery;
use crate::types::{ContentModuleName, ModuleLoading};

/// True iff the module has at least one product/module-set source and every
/// such source loads it embedded. Plugin sources are ignored.
pub fn is_globally_embedded<G: GraphQuery + ?Sized>(graph: &G, module: &ContentModuleName) -> bool {
    let Some(node) = graph.content_module(module) else {
        return false;
    };
    let mut sources = node.non_plugin_sources().peekable();
    if sources.peek().is_none() {
        return false;
    }
    sources.all(|source| source.loading == ModuleLoading::Embedded)
}

/// A plugin never needs to declare a dependency on a globally embedded module.
pub fn should_skip_embedded_plugin_dependency<G: GraphQuery + ?Sized>(
    graph: &G,
    dependency: &ContentModuleName,
) -> bool {
    is_globally_embedded(graph, dependency)
}

/// A module that lives only in plugin content does not declare dependencies
/// on globally embedded modules.
///
/// Modules with any product/module-set source always declare them: the
/// product's guarantee does not cross plugin boundaries in that direction.
pub fn should_skip_embedded_content_dependency<G: GraphQuery + ?Sized>(
    graph: &G,
    source: &ContentModuleName,
    dependency: &ContentModuleName,
) -> bool {
    let Some(node) = graph.content_module(source) else {
        return false;
    };
    let plugin_only = !node.sources.is_empty() && node.non_plugin_sources().next().is_none();
    plugin_only && is_globally_embedded(graph, dependency)
}
