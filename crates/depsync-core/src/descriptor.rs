//! # Descriptor Snapshots
//!
//! Descriptor files are parsed elsewhere. The planners only see immutable
//! snapshots: the original content plus the dependency declarations a
//! parser extracted from it.
//!
//! Lookups go through `DescriptorProvider`; `MemoizedDescriptorProvider`
//! caches them by name so repeated analysis of the same descriptor is paid
//! once per run.

use crate::types::{ContentModuleName, PluginId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Root element of a module descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorRoot {
    /// A root the generator knows how to rewrite.
    #[default]
    Standard,
    /// Any other root element; the descriptor is passed through untouched.
    NonStandard(String),
}

/// Snapshot of a content module descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSnapshot {
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub root: DescriptorRoot,
    /// `<module name=".."/>` entries of the `<dependencies>` section.
    #[serde(default)]
    pub module_dependencies: BTreeSet<ContentModuleName>,
    /// `<plugin id=".."/>` entries of the `<dependencies>` section.
    #[serde(default)]
    pub plugin_dependencies: BTreeSet<PluginId>,
}

/// Snapshot of a plugin descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptorSnapshot {
    pub path: String,
    #[serde(default)]
    pub content: String,
    /// Declared `<id>`; `None` when the descriptor omits it.
    #[serde(default)]
    pub plugin_id: Option<PluginId>,
    #[serde(default)]
    pub module_dependencies: BTreeSet<ContentModuleName>,
    #[serde(default)]
    pub plugin_dependencies: BTreeSet<PluginId>,
    /// Deprecated `<depends>` ids.
    #[serde(default)]
    pub legacy_depends: BTreeSet<PluginId>,
    #[serde(default)]
    pub has_dependencies_section: bool,
    /// Module dependencies already declared by included fragments.
    #[serde(default)]
    pub xi_include_module_dependencies: BTreeSet<ContentModuleName>,
    /// Plugin dependencies already declared by included fragments.
    #[serde(default)]
    pub xi_include_plugin_dependencies: BTreeSet<PluginId>,
}

/// Supplies descriptor snapshots by entity name.
pub trait DescriptorProvider: Debug + Send + Sync {
    fn module_descriptor(&self, module: &ContentModuleName) -> Option<Arc<DescriptorSnapshot>>;

    fn plugin_descriptor(&self, plugin: &PluginId) -> Option<Arc<PluginDescriptorSnapshot>>;
}

/// All descriptors of a run, held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSet {
    #[serde(default)]
    pub modules: BTreeMap<ContentModuleName, Arc<DescriptorSnapshot>>,
    #[serde(default)]
    pub plugins: BTreeMap<PluginId, Arc<PluginDescriptorSnapshot>>,
}

impl DescriptorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_module(&mut self, module: ContentModuleName, descriptor: DescriptorSnapshot) {
        self.modules.insert(module, Arc::new(descriptor));
    }

    pub fn insert_plugin(&mut self, plugin: PluginId, descriptor: PluginDescriptorSnapshot) {
        self.plugins.insert(plugin, Arc::new(descriptor));
    }
}

impl DescriptorProvider for DescriptorSet {
    fn module_descriptor(&self, module: &ContentModuleName) -> Option<Arc<DescriptorSnapshot>> {
        self.modules.get(module).cloned()
    }

    fn plugin_descriptor(&self, plugin: &PluginId) -> Option<Arc<PluginDescriptorSnapshot>> {
        self.plugins.get(plugin).cloned()
    }
}

/// Caches every lookup of an inner provider, including misses.
#[derive(Debug)]
pub struct MemoizedDescriptorProvider<P> {
    inner: P,
    modules: Mutex<BTreeMap<ContentModuleName, Option<Arc<DescriptorSnapshot>>>>,
    plugins: Mutex<BTreeMap<PluginId, Option<Arc<PluginDescriptorSnapshot>>>>,
    loads: AtomicU64,
}

impl<P: DescriptorProvider> MemoizedDescriptorProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            modules: Mutex::new(BTreeMap::new()),
            plugins: Mutex::new(BTreeMap::new()),
            loads: AtomicU64::new(0),
        }
    }

    /// Number of lookups that reached the inner provider.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

impl<P: DescriptorProvider> DescriptorProvider for MemoizedDescriptorProvider<P> {
    fn module_descriptor(&self, module: &ContentModuleName) -> Option<Arc<DescriptorSnapshot>> {
        if let Some(cached) = self.modules.lock().get(module) {
            return cached.clone();
        }
        // Loaded outside the lock; a racing load of the same name is harmless.
        self.loads.fetch_add(1, Ordering::Relaxed);
        let loaded = self.inner.module_descriptor(module);
        self.modules
            .lock()
            .entry(module.clone())
            .or_insert(loaded)
            .clone()
    }

    fn plugin_descriptor(&self, plugin: &PluginId) -> Option<Arc<PluginDescriptorSnapshot>> {
        if let Some(cached) = self.plugins.lock().get(plugin) {
            return cached.clone();
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
        let loaded = self.inner.plugin_descriptor(plugin);
        self.plugins
            .lock()
            .entry(plugin.clone())
            .or_insert(loaded)
            .clone()
    }
}
