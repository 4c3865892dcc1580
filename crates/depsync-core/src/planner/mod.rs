//! # Planners
//!
//! Three planners share one shape: classify each entity's build edges, run
//! the suppression ledger, assemble an immutable plan.
//!
//! Entities are independent. Each one is planned on tokio's blocking pool
//! with a bounded number of tasks in flight; results are sorted by entity
//! name after the join so scheduling never shows up in the output.

pub mod content_module;
pub mod plugin;
pub mod test_plugin;

pub use content_module::{ContentModulePlanning, DependencyPlan, plan_content_modules};
pub use plugin::{PluginDependencyPlan, PluginPlanning, plan_plugins};
pub use test_plugin::{
    TestPluginDependencyPlan, UnresolvedDependency, UnresolvedEntry, plan_test_plugins,
};

use crate::descriptor::DescriptorProvider;
use crate::library::LibraryFilter;
use crate::primitives::{DEFAULT_CONCURRENCY, bounded_concurrency};
use crate::suppression::SuppressionConfig;
use crate::types::{ContentModuleName, DepsyncError, PluginId};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Restricts a run to some content modules and plugins.
///
/// `None` means "everything of that kind".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningScope {
    #[serde(default)]
    pub content_modules: Option<BTreeSet<ContentModuleName>>,
    /// Plugins and test plugins.
    #[serde(default)]
    pub plugins: Option<BTreeSet<PluginId>>,
}

impl PlanningScope {
    /// A scope covering every entity.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.content_modules.is_none() && self.plugins.is_none()
    }

    #[must_use]
    pub fn includes_module(&self, name: &ContentModuleName) -> bool {
        self.content_modules.as_ref().is_none_or(|names| names.contains(name))
    }

    #[must_use]
    pub fn includes_plugin(&self, id: &PluginId) -> bool {
        self.plugins.as_ref().is_none_or(|ids| ids.contains(id))
    }
}

/// Everything a planner needs besides the graph snapshot.
#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub suppressions: Arc<SuppressionConfig>,
    pub libraries: Arc<dyn LibraryFilter>,
    pub descriptors: Arc<dyn DescriptorProvider>,
    /// Capture drift between graph and descriptors as new suppressions.
    pub update_suppressions: bool,
    pub concurrency: usize,
    pub scope: PlanningScope,
}

impl PlanningContext {
    /// A non-update, full-scope context with default concurrency.
    pub fn new(
        suppressions: SuppressionConfig,
        libraries: Arc<dyn LibraryFilter>,
        descriptors: Arc<dyn DescriptorProvider>,
    ) -> Self {
        Self {
            suppressions: Arc::new(suppressions),
            libraries,
            descriptors,
            update_suppressions: false,
            concurrency: DEFAULT_CONCURRENCY,
            scope: PlanningScope::full(),
        }
    }

    #[must_use]
    pub fn with_update(mut self, update_suppressions: bool) -> Self {
        self.update_suppressions = update_suppressions;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: PlanningScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Run `task` once per item on the blocking pool, at most `concurrency` at a time.
///
/// Results come back in completion order; callers sort them.
pub(crate) async fn fan_out<I, R, F>(
    items: Vec<I>,
    concurrency: usize,
    task: F,
) -> Result<Vec<R>, DepsyncError>
where
    I: Send + 'static,
    R: Send + 'static,
    F: Fn(I) -> R + Send + Sync + 'static,
{
    let task = Arc::new(task);
    let joined: Vec<Result<R, tokio::task::JoinError>> = stream::iter(items)
        .map(|item| {
            let task = Arc::clone(&task);
            tokio::task::spawn_blocking(move || task(item))
        })
        .buffer_unordered(bounded_concurrency(concurrency))
        .collect()
        .await;

    joined
        .into_iter()
        .map(|result| result.map_err(|e| DepsyncError::TaskFailed(e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fan_out_runs_every_item() {
        let mut results = fan_out((0..50u32).collect(), 4, |n| n * 2)
            .await
            .expect("fan out");
        results.sort_unstable();
        assert_eq!(results.len(), 50);
        assert_eq!(results[49], 98);
    }

    #[test]
    fn scope_filters() {
        let scope = PlanningScope {
            content_modules: Some([ContentModuleName::new("a")].into_iter().collect()),
            plugins: None,
        };
        assert!(scope.includes_module(&ContentModuleName::new("a")));
        assert!(!scope.includes_module(&ContentModuleName::new("b")));
        assert!(scope.includes_plugin(&PluginId::new("any")));
        assert!(!scope.is_full());
        assert!(PlanningScope::full().is_full());
    }
}
