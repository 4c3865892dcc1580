//! # Library Validators
//!
//! Run after the content-module write-back and read the derived edges.
//!
//! Each finding is either excused by a suppression (and recorded as a usage)
//! or reported as a suppressible pipeline error.

use crate::graph::{DependencyGraph, DependencyView, GraphQuery};
use crate::suppression::{SuppressionConfig, SuppressionType, SuppressionUsage};
use crate::types::{ContentModuleName, PipelineError, PipelineErrorKind};
use std::collections::BTreeSet;

/// Findings of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub usages: Vec<SuppressionUsage>,
    pub errors: Vec<PipelineError>,
    /// `(module, dependency)` pairs whose dependency is an orphan node.
    pub unknown_dependencies: Vec<(ContentModuleName, ContentModuleName)>,
}

/// Validate the given planned modules against the written-back graph.
pub fn validate_libraries(
    graph: &DependencyGraph,
    modules: &[ContentModuleName],
    suppressions: &SuppressionConfig,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    for module in modules {
        check_library_replacement(graph, module, suppressions, &mut outcome);
        check_test_library_scope(graph, module, suppressions, &mut outcome);
        check_unknown_dependencies(graph, module, &mut outcome);
    }
    outcome.usages.sort();
    outcome.errors.sort();
    outcome.unknown_dependencies.sort();

    tracing::debug!(
        usages = outcome.usages.len(),
        errors = outcome.errors.len(),
        unknown = outcome.unknown_dependencies.len(),
        "library validation complete"
    );
    outcome
}

/// A raw project library used where a library module replaces it.
fn check_library_replacement(
    graph: &DependencyGraph,
    module: &ContentModuleName,
    suppressions: &SuppressionConfig,
    outcome: &mut ValidationOutcome,
) {
    let Some(target) = graph.content_module(module).and_then(|m| m.target.as_ref()) else {
        return;
    };
    let allowed = suppressions.content_module(module).map(|s| &s.suppress_libraries);
    let libraries: BTreeSet<_> = graph
        .depends_on(target)
        .iter()
        .filter_map(|edge| {
            graph
                .library_replacement(&edge.target)
                .map(|replacement| (&edge.target, replacement))
        })
        .collect();

    for (library, replacement) in libraries {
        if allowed.is_some_and(|set| set.contains(library)) {
            outcome.usages.push(SuppressionUsage::new(
                module,
                library,
                SuppressionType::LibraryReplacement,
            ));
        } else {
            outcome.errors.push(PipelineError::new(
                module,
                PipelineErrorKind::LibraryReplacement,
                format!(
                    "uses project library '{library}'; \
                     depend on library module '{replacement}' instead"
                ),
            ));
        }
    }
}

/// A production module reaching a library module only through test scope.
fn check_test_library_scope(
    graph: &DependencyGraph,
    module: &ContentModuleName,
    suppressions: &SuppressionConfig,
    outcome: &mut ValidationOutcome,
) {
    if module.is_test_descriptor() {
        return;
    }
    let production: BTreeSet<ContentModuleName> = graph
        .module_dependencies(DependencyView::Production, module)
        .into_iter()
        .collect();
    let allowed = suppressions.content_module(module).map(|s| &s.suppress_test_library_scope);

    for library in graph
        .module_dependencies(DependencyView::Test, module)
        .into_iter()
        .filter(|dep| dep.is_library() && !production.contains(dep))
    {
        if allowed.is_some_and(|set| set.contains(&library)) {
            outcome.usages.push(SuppressionUsage::new(
                module,
                &library,
                SuppressionType::TestLibraryScope,
            ));
        } else {
            outcome.errors.push(PipelineError::new(
                module,
                PipelineErrorKind::TestLibraryScope,
                format!("library module '{library}' is only used in test scope"),
            ));
        }
    }
}

fn check_unknown_dependencies(
    graph: &DependencyGraph,
    module: &ContentModuleName,
    outcome: &mut ValidationOutcome,
) {
    for dependency in graph.module_dependencies(DependencyView::Production, module) {
        if graph.content_module(&dependency).is_some_and(|node| node.is_orphan()) {
            tracing::warn!(
                module = %module,
                dependency = %dependency,
                "dependency on unknown module"
            );
            outcome.unknown_dependencies.push((module.clone(), dependency));
        }
    }
}
