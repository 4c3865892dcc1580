//! # Suppression Config Reconciler
//!
//! Rebuilds the suppression config from the usages of one run and reports
//! persisted entries that no usage backs anymore.
//!
//! The previous config is never patched. Entries of entities that were not
//! processed in this run are carried over verbatim; everything else comes
//! from usages alone.

use crate::suppression::{
    ContentModuleSuppression, PluginSuppression, SuppressionConfig, SuppressionType,
    SuppressionUsage,
};
use crate::types::{ContentModuleName, PluginId, TargetName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Missing-`<id>` state of one processed plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginIdStatus {
    /// The descriptor declares no `<id>`.
    pub missing: bool,
    /// The missing id was tolerated by an allowance (or captured in update mode).
    pub allowance_used: bool,
}

/// Everything the reconciler reads.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    pub previous: &'a SuppressionConfig,
    pub usages: &'a [SuppressionUsage],
    /// Content modules re-evaluated in this run.
    pub processed_modules: &'a BTreeSet<ContentModuleName>,
    /// Plugins re-evaluated in this run.
    pub processed_plugins: &'a BTreeSet<PluginId>,
    pub plugin_ids: &'a BTreeMap<PluginId, PluginIdStatus>,
}

/// What kind of persisted entry went stale.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StaleKind {
    Dependency {
        kind: SuppressionType,
        dependency: String,
    },
    AllowMissingPluginId,
}

/// A persisted entry with no supporting usage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaleSuppression {
    pub entity: String,
    pub kind: StaleKind,
}

/// Result of reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub config: SuppressionConfig,
    /// Sorted.
    pub stale: Vec<StaleSuppression>,
    /// The rebuilt config differs from the previous one.
    pub modified: bool,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn stale_count(&self) -> usize {
        self.stale.len()
    }
}

/// Rebuild the config and detect stale entries.
pub fn reconcile(input: ReconcileInput<'_>) -> ReconcileOutcome {
    let ReconcileInput {
        previous,
        usages,
        processed_modules,
        processed_plugins,
        plugin_ids,
    } = input;

    let mut config = rebuild_from_usages(usages);
    for (id, status) in plugin_ids {
        if status.allowance_used {
            config.plugins.entry(id.clone()).or_default().allow_missing_plugin_id = true;
        }
    }

    let mut stale = Vec::new();
    for (name, entry) in &previous.content_modules {
        if processed_modules.contains(name) {
            let rebuilt = config.content_modules.get(name);
            collect_stale_modules(name, entry, rebuilt, &mut stale);
        } else {
            carry_module(config.content_modules.entry(name.clone()).or_default(), entry);
        }
    }
    for (id, entry) in &previous.plugins {
        if processed_plugins.contains(id) {
            let rebuilt = config.plugins.get(id);
            let still_missing = plugin_ids.get(id).is_some_and(|status| status.missing);
            collect_stale_plugin(id, entry, rebuilt, still_missing, &mut stale);
        } else {
            carry_plugin(config.plugins.entry(id.clone()).or_default(), entry);
        }
    }

    config.content_modules.retain(|_, entry| !entry.is_empty());
    config.plugins.retain(|_, entry| !entry.is_empty());
    stale.sort();

    for entry in &stale {
        tracing::warn!(entity = %entry.entity, kind = ?entry.kind, "stale suppression");
    }
    let modified = config != *previous;
    tracing::info!(
        entries = config.entry_count(),
        stale = stale.len(),
        modified,
        "suppression config reconciled"
    );

    ReconcileOutcome {
        config,
        stale,
        modified,
    }
}

fn rebuild_from_usages(usages: &[SuppressionUsage]) -> SuppressionConfig {
    let mut config = SuppressionConfig::new();
    for usage in usages {
        let dependency = usage.dependency.as_str();
        if usage.kind.is_plugin_role() {
            let entry = config.plugins.entry(PluginId::new(&usage.source)).or_default();
            match usage.kind {
                SuppressionType::PluginXmlModule => {
                    entry.suppress_modules.insert(ContentModuleName::new(dependency));
                }
                _ => {
                    entry.suppress_plugins.insert(PluginId::new(dependency));
                }
            }
            continue;
        }
        let entry = config
            .content_modules
            .entry(ContentModuleName::new(&usage.source))
            .or_default();
        match usage.kind {
            SuppressionType::ModuleDep => {
                entry.suppress_modules.insert(ContentModuleName::new(dependency));
            }
            SuppressionType::PluginDep => {
                entry.suppress_plugins.insert(PluginId::new(dependency));
            }
            SuppressionType::LibraryReplacement => {
                entry.suppress_libraries.insert(TargetName::new(dependency));
            }
            SuppressionType::TestLibraryScope => {
                entry.suppress_test_library_scope.insert(ContentModuleName::new(dependency));
            }
            SuppressionType::PluginXmlModule | SuppressionType::PluginXmlPlugin => {}
        }
    }
    config
}

fn carry_module(target: &mut ContentModuleSuppression, previous: &ContentModuleSuppression) {
    target.suppress_modules.extend(previous.suppress_modules.iter().cloned());
    target.suppress_plugins.extend(previous.suppress_plugins.iter().cloned());
    target.suppress_libraries.extend(previous.suppress_libraries.iter().cloned());
    target
        .suppress_test_library_scope
        .extend(previous.suppress_test_library_scope.iter().cloned());
}

fn carry_plugin(target: &mut PluginSuppression, previous: &PluginSuppression) {
    target.suppress_modules.extend(previous.suppress_modules.iter().cloned());
    target.suppress_plugins.extend(previous.suppress_plugins.iter().cloned());
    target.allow_missing_plugin_id |= previous.allow_missing_plugin_id;
}

fn missing_from<T: Ord + AsRef<str>>(
    entity: &str,
    kind: SuppressionType,
    previous: &BTreeSet<T>,
    rebuilt: Option<&BTreeSet<T>>,
    stale: &mut Vec<StaleSuppression>,
) {
    for dependency in previous {
        if !rebuilt.is_some_and(|set| set.contains(dependency)) {
            stale.push(StaleSuppression {
                entity: entity.to_string(),
                kind: StaleKind::Dependency {
                    kind,
                    dependency: dependency.as_ref().to_string(),
                },
            });
        }
    }
}

fn collect_stale_modules(
    name: &ContentModuleName,
    previous: &ContentModuleSuppression,
    rebuilt: Option<&ContentModuleSuppression>,
    stale: &mut Vec<StaleSuppression>,
) {
    let entity = name.as_str();
    missing_from(
        entity,
        SuppressionType::ModuleDep,
        &previous.suppress_modules,
        rebuilt.map(|r| &r.suppress_modules),
        stale,
    );
    missing_from(
        entity,
        SuppressionType::PluginDep,
        &previous.suppress_plugins,
        rebuilt.map(|r| &r.suppress_plugins),
        stale,
    );
    missing_from(
        entity,
        SuppressionType::LibraryReplacement,
        &previous.suppress_libraries,
        rebuilt.map(|r| &r.suppress_libraries),
        stale,
    );
    missing_from(
        entity,
        SuppressionType::TestLibraryScope,
        &previous.suppress_test_library_scope,
        rebuilt.map(|r| &r.suppress_test_library_scope),
        stale,
    );
}

fn collect_stale_plugin(
    id: &PluginId,
    previous: &PluginSuppression,
    rebuilt: Option<&PluginSuppression>,
    still_missing: bool,
    stale: &mut Vec<StaleSuppression>,
) {
    let entity = id.as_str();
    missing_from(
        entity,
        SuppressionType::PluginXmlModule,
        &previous.suppress_modules,
        rebuilt.map(|r| &r.suppress_modules),
        stale,
    );
    missing_from(
        entity,
        SuppressionType::PluginXmlPlugin,
        &previous.suppress_plugins,
        rebuilt.map(|r| &r.suppress_plugins),
        stale,
    );
    if previous.allow_missing_plugin_id && !still_missing {
        stale.push(StaleSuppression {
            entity: entity.to_string(),
            kind: StaleKind::AllowMissingPluginId,
        });
    }
}
