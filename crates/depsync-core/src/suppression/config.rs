//! # Suppression Config
//!
//! The persisted override file, partitioned by role. JSON on disk; empty
//! collections are omitted so rebuilt files stay minimal.

use crate::types::{ContentModuleName, DepsyncError, PluginId, TargetName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Overrides of one content module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentModuleSuppression {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub suppress_modules: BTreeSet<ContentModuleName>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub suppress_plugins: BTreeSet<PluginId>,
    /// Raw library targets allowed despite an existing library module.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub suppress_libraries: BTreeSet<TargetName>,
    /// Library modules allowed in test scope.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub suppress_test_library_scope: BTreeSet<ContentModuleName>,
}

impl ContentModuleSuppression {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suppress_modules.is_empty()
            && self.suppress_plugins.is_empty()
            && self.suppress_libraries.is_empty()
            && self.suppress_test_library_scope.is_empty()
    }
}

/// Overrides of one plugin descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSuppression {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub suppress_modules: BTreeSet<ContentModuleName>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub suppress_plugins: BTreeSet<PluginId>,
    /// The descriptor may omit `<id>`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_missing_plugin_id: bool,
}

impl PluginSuppression {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suppress_modules.is_empty()
            && self.suppress_plugins.is_empty()
            && !self.allow_missing_plugin_id
    }
}

const fn is_false(value: &bool) -> bool {
    !*value
}

/// The whole suppression file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content_modules: BTreeMap<ContentModuleName, ContentModuleSuppression>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<PluginId, PluginSuppression>,
}

impl SuppressionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, DepsyncError> {
        serde_json::from_str(json).map_err(|e| DepsyncError::DeserializationError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, DepsyncError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DepsyncError::SerializationError(e.to_string()))
    }

    #[must_use]
    pub fn content_module(&self, name: &ContentModuleName) -> Option<&ContentModuleSuppression> {
        self.content_modules.get(name)
    }

    #[must_use]
    pub fn plugin(&self, id: &PluginId) -> Option<&PluginSuppression> {
        self.plugins.get(id)
    }

    /// Total number of suppressed entries (flags count as one).
    #[must_use]
    pub fn entry_count(&self) -> usize {
        let modules: usize = self
            .content_modules
            .values()
            .map(|s| {
                s.suppress_modules.len()
                    + s.suppress_plugins.len()
                    + s.suppress_libraries.len()
                    + s.suppress_test_library_scope.len()
            })
            .sum();
        let plugins: usize = self
            .plugins
            .values()
            .map(|s| {
                s.suppress_modules.len()
                    + s.suppress_plugins.len()
                    + usize::from(s.allow_missing_plugin_id)
            })
            .sum();
        modules + plugins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collections_are_omitted() {
        let mut config = SuppressionConfig::new();
        config.content_modules.insert(
            ContentModuleName::new("m"),
            ContentModuleSuppression {
                suppress_modules: [ContentModuleName::new("n")].into_iter().collect(),
                ..ContentModuleSuppression::default()
            },
        );
        let json = config.to_json_pretty().expect("serialize");
        assert!(json.contains("suppress_modules"));
        assert!(!json.contains("suppress_plugins"));
        assert!(!json.contains("\"plugins\""));
    }

    #[test]
    fn json_roundtrip() {
        let json = r#"{
            "content_modules": {"m": {"suppress_modules": ["x", "n"]}},
            "plugins": {"com.p": {"allow_missing_plugin_id": true}}
        }"#;
        let config = SuppressionConfig::from_json(json).expect("parse");
        assert_eq!(config.entry_count(), 3);
        let again = SuppressionConfig::from_json(&config.to_json_pretty().expect("serialize"))
            .expect("reparse");
        assert_eq!(again, config);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            SuppressionConfig::from_json("{not json"),
            Err(DepsyncError::DeserializationError(_))
        ));
    }
}
