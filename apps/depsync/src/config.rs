//! # Run Configuration
//!
//! `depsync.toml` settings. Every field is optional; CLI flags override
//! what the file says.
//!
//! ```toml
//! concurrency = 16
//! update_suppressions = false
//! library_denylist = ["intellij.libraries.grpc"]
//! suppressed_error_keys = ["missing-descriptor:intellij.foo"]
//!
//! [scope]
//! content_modules = ["intellij.foo", "intellij.bar"]
//! ```

use depsync_core::primitives::DEFAULT_CONCURRENCY;
use depsync_core::{
    AllowAllLibraries, ContentModuleName, DepsyncError, DescriptorProvider, LibraryAllowList,
    LibraryFilter, PlanningContext, PlanningScope, SuppressionConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Library modules that may be declared. Empty means all of them.
    pub library_allowlist: BTreeSet<ContentModuleName>,
    /// Library modules that are never declared.
    pub library_denylist: BTreeSet<ContentModuleName>,
    pub concurrency: usize,
    pub update_suppressions: bool,
    /// Pipeline error keys (`<kind>:<entity>`) that do not fail the run.
    pub suppressed_error_keys: BTreeSet<String>,
    pub scope: PlanningScope,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            library_allowlist: BTreeSet::new(),
            library_denylist: BTreeSet::new(),
            concurrency: DEFAULT_CONCURRENCY,
            update_suppressions: false,
            suppressed_error_keys: BTreeSet::new(),
            scope: PlanningScope::full(),
        }
    }
}

impl RunConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, DepsyncError> {
        toml::from_str(content)
            .map_err(|e| DepsyncError::DeserializationError(format!("Invalid run config: {e}")))
    }

    /// Load the config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, DepsyncError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = crate::inputs::read_text(path, MAX_CONFIG_FILE_SIZE)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded run config");
        Ok(config)
    }

    /// The library predicate described by the allow and deny lists.
    #[must_use]
    pub fn library_filter(&self) -> Arc<dyn LibraryFilter> {
        if self.library_allowlist.is_empty() && self.library_denylist.is_empty() {
            return Arc::new(AllowAllLibraries);
        }
        Arc::new(LibraryAllowList::new(
            self.library_allowlist.iter().cloned(),
            self.library_denylist.iter().cloned(),
        ))
    }

    /// Planning context for this config.
    #[must_use]
    pub fn planning_context(
        &self,
        suppressions: SuppressionConfig,
        descriptors: Arc<dyn DescriptorProvider>,
    ) -> PlanningContext {
        PlanningContext::new(suppressions, self.library_filter(), descriptors)
            .with_update(self.update_suppressions)
            .with_concurrency(self.concurrency)
            .with_scope(self.scope.clone())
    }
}
