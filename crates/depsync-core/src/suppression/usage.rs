//! Suppression usage records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which suppression list a usage documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuppressionType {
    /// Content module -> module dependency.
    ModuleDep,
    /// Content module -> plugin dependency.
    PluginDep,
    /// Plugin descriptor -> module dependency.
    PluginXmlModule,
    /// Plugin descriptor -> plugin dependency.
    PluginXmlPlugin,
    /// Content module uses a raw library that has a library module.
    LibraryReplacement,
    /// Production module uses a library module in test scope.
    TestLibraryScope,
}

impl SuppressionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModuleDep => "MODULE_DEP",
            Self::PluginDep => "PLUGIN_DEP",
            Self::PluginXmlModule => "PLUGIN_XML_MODULE",
            Self::PluginXmlPlugin => "PLUGIN_XML_PLUGIN",
            Self::LibraryReplacement => "LIBRARY_REPLACEMENT",
            Self::TestLibraryScope => "TEST_LIBRARY_SCOPE",
        }
    }

    /// Usages of these types belong to plugin entries of the config.
    #[must_use]
    pub const fn is_plugin_role(self) -> bool {
        matches!(self, Self::PluginXmlModule | Self::PluginXmlPlugin)
    }
}

impl fmt::Display for SuppressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence that one suppression was exercised during this run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SuppressionUsage {
    /// Content module name or plugin id.
    pub source: String,
    pub dependency: String,
    pub kind: SuppressionType,
}

impl SuppressionUsage {
    #[must_use]
    pub fn new(
        source: impl AsRef<str>,
        dependency: impl AsRef<str>,
        kind: SuppressionType,
    ) -> Self {
        Self {
            source: source.as_ref().to_string(),
            dependency: dependency.as_ref().to_string(),
            kind,
        }
    }
}
