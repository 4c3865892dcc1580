//! # Core Type Definitions
//!
//! This module contains the value types shared by every planner:
//! - Identifiers (`ContentModuleName`, `PluginId`, `TargetName`)
//! - Raw build dependencies (`DependencyScope`, `RawDependency`)
//! - Target classification (`Classification`)
//! - Content sources (`ContentSource`, `ContentSourceKind`, `ModuleLoading`)
//! - Error types (`DepsyncError`, `PipelineError`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers implement `Ord` by their underlying string so that every
//! `BTreeMap`/`BTreeSet` keyed by them iterates in name order.

use crate::primitives::{LIBRARY_MODULE_PREFIX, SLASH_NOTATION_SEPARATOR, TEST_DESCRIPTOR_SUFFIX};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create an identifier from a string.
            #[must_use]
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(Arc::from(s.as_ref()))
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// An empty identifier is never valid.
            #[must_use]
            pub fn is_valid(&self) -> bool {
                !self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

name_type!(
    /// Name of a content module (a unit of product content with its own descriptor).
    ContentModuleName
);

name_type!(
    /// Identifier of a plugin (its `<id>` or one of its aliases).
    PluginId
);

name_type!(
    /// Name of a build target in the lower-level build graph.
    TargetName
);

impl ContentModuleName {
    /// Library modules carry the reserved library prefix.
    #[must_use]
    pub fn is_library(&self) -> bool {
        self.0.starts_with(LIBRARY_MODULE_PREFIX)
    }

    /// Slash-notation modules are virtual modules layered onto another descriptor.
    #[must_use]
    pub fn is_slash_notation(&self) -> bool {
        self.0.contains(SLASH_NOTATION_SEPARATOR)
    }

    /// Modules whose descriptor is loaded in a test context.
    #[must_use]
    pub fn is_test_descriptor(&self) -> bool {
        self.0.ends_with(TEST_DESCRIPTOR_SUFFIX)
    }
}

// =============================================================================
// RAW DEPENDENCIES
// =============================================================================

/// Scope of a raw build dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyScope {
    Compile,
    Runtime,
    Test,
    Provided,
}

impl DependencyScope {
    /// COMPILE and RUNTIME are the only production-visible scopes.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Compile | Self::Runtime)
    }

    /// Whether an edge of this scope takes part in a view.
    ///
    /// Without test scope, TEST and PROVIDED edges are dropped.
    #[must_use]
    pub const fn is_visible(self, include_test_scope: bool) -> bool {
        include_test_scope || self.is_production()
    }
}

/// One outgoing edge of a build target: `(source, target, scope)` with the
/// source implied by where the edge is stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawDependency {
    pub target: TargetName,
    pub scope: DependencyScope,
}

impl RawDependency {
    #[must_use]
    pub fn new(target: impl AsRef<str>, scope: DependencyScope) -> Self {
        Self {
            target: TargetName::new(target),
            scope,
        }
    }
}

/// Result of classifying a raw dependency target.
///
/// Closed set: every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    /// The target backs a content module.
    ModuleDep(ContentModuleName),
    /// The target is the primary target of a plugin.
    PluginDep(PluginId),
    /// The target is neither; it is ignored.
    Skip,
}

// =============================================================================
// CONTENT SOURCES
// =============================================================================

/// How a content source loads a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleLoading {
    Embedded,
    Required,
    Optional,
    OnDemand,
}

/// Where a content module is declared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSourceKind {
    /// Declared directly in a product.
    Product(String),
    /// Declared in a module set (included by products).
    ModuleSet(String),
    /// Declared in a plugin's content block.
    Plugin(PluginId),
}

impl ContentSourceKind {
    #[must_use]
    pub const fn is_plugin(&self) -> bool {
        matches!(self, Self::Plugin(_))
    }
}

/// A content-source edge: which source declares a module and how it loads it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentSource {
    pub source: ContentSourceKind,
    pub loading: ModuleLoading,
}

impl ContentSource {
    #[must_use]
    pub fn product(name: impl Into<String>, loading: ModuleLoading) -> Self {
        Self {
            source: ContentSourceKind::Product(name.into()),
            loading,
        }
    }

    #[must_use]
    pub fn module_set(name: impl Into<String>, loading: ModuleLoading) -> Self {
        Self {
            source: ContentSourceKind::ModuleSet(name.into()),
            loading,
        }
    }

    #[must_use]
    pub fn plugin(id: impl AsRef<str>, loading: ModuleLoading) -> Self {
        Self {
            source: ContentSourceKind::Plugin(PluginId::new(id)),
            loading,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that abort an operation.
///
/// Per-entity problems that must not abort a run are `PipelineError` values
/// attached to plans instead.
#[derive(Debug, Error)]
pub enum DepsyncError {
    /// An identifier was empty.
    #[error("Empty {0} name")]
    EmptyName(&'static str),

    /// A node with the same name was already added.
    #[error("Duplicate {kind}: {name}")]
    DuplicateNode { kind: &'static str, name: String },

    /// A plan references an entity missing from the graph at write-back time.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A planning task panicked or was cancelled.
    #[error("Planning task failed: {0}")]
    TaskFailed(String),
}

/// Category of a suppressible per-entity error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorKind {
    /// The descriptor root is not one the generator understands.
    NonStandardDescriptorRoot,
    /// No descriptor snapshot exists for the entity.
    MissingDescriptor,
    /// The plugin descriptor declares no plugin id.
    MissingPluginId,
    /// A raw project library is used where a library module exists.
    LibraryReplacement,
    /// A production module uses a library module in test scope.
    TestLibraryScope,
}

impl PipelineErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonStandardDescriptorRoot => "non-standard-descriptor-root",
            Self::MissingDescriptor => "missing-descriptor",
            Self::MissingPluginId => "missing-plugin-id",
            Self::LibraryReplacement => "library-replacement",
            Self::TestLibraryScope => "test-library-scope",
        }
    }
}

/// A suppressible error attached to one entity.
///
/// Never thrown: it travels with the entity's plan and is surfaced to the
/// caller as structured data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PipelineError {
    pub entity: String,
    pub kind: PipelineErrorKind,
    pub message: String,
}

impl PipelineError {
    #[must_use]
    pub fn new(
        entity: impl AsRef<str>,
        kind: PipelineErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.as_ref().to_string(),
            kind,
            message: message.into(),
        }
    }

    /// Stable key used to suppress this error: `<kind>:<entity>`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.entity)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.entity, self.message)
    }
}

// =============================================================================
// TESTS
// =============================================================================
