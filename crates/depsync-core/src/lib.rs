//! # depsync-core
//!
//! Dependency-plan computation and suppression reconciliation - THE LOGIC.
//!
//! Given a build-dependency graph, descriptor snapshots and a persisted
//! suppression file, this crate computes which module and plugin
//! dependencies every descriptor must declare, applies the suppression
//! overrides, and rebuilds the suppression file from what was actually used.
//!
//! ## Architectural Constraints
//!
//! - No file I/O: descriptors, graph snapshots and suppressions arrive as values
//! - Deterministic: every emitted list is sorted; BTreeMap/BTreeSet throughout
//! - The graph is an immutable snapshot, replaced wholesale on write-back
//! - Per-entity failures become `PipelineError` values, never abort siblings

// =============================================================================
// MODULES
// =============================================================================

pub mod classifier;
pub mod descriptor;
pub mod embedding;
pub mod fingerprint;
pub mod formats;
pub mod generation;
pub mod graph;
pub mod library;
pub mod planner;
pub mod primitives;
pub mod reconciler;
pub mod store;
pub mod suppression;
pub mod types;
pub mod validators;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Classification, ContentModuleName, ContentSource, ContentSourceKind, DependencyScope,
    DepsyncError, ModuleLoading, PipelineError, PipelineErrorKind, PluginId, RawDependency,
    TargetName,
};

// =============================================================================
// RE-EXPORTS: Graph
// =============================================================================

pub use graph::{
    DependencyGraph, DependencyView, GraphDocument, GraphQuery, PluginKind, PluginNode, Product,
    TestPluginSpec,
};
pub use store::GraphStore;

// =============================================================================
// RE-EXPORTS: Planning
// =============================================================================

pub use classifier::{ClassifiedDependencies, DependencySource, classify_dependencies};
pub use descriptor::{
    DescriptorProvider, DescriptorRoot, DescriptorSet, DescriptorSnapshot,
    MemoizedDescriptorProvider, PluginDescriptorSnapshot,
};
pub use embedding::{
    is_globally_embedded, should_skip_embedded_content_dependency,
    should_skip_embedded_plugin_dependency,
};
pub use library::{AllowAllLibraries, LibraryAllowList, LibraryFilter};
pub use planner::{
    DependencyPlan, PlanningContext, PlanningScope, PluginDependencyPlan,
    TestPluginDependencyPlan, UnresolvedDependency, UnresolvedEntry,
};

// =============================================================================
// RE-EXPORTS: Suppressions
// =============================================================================

pub use reconciler::{ReconcileOutcome, StaleKind, StaleSuppression, reconcile};
pub use suppression::{
    ContentModuleSuppression, PluginSuppression, SuppressionConfig, SuppressionLedger,
    SuppressionType, SuppressionUsage,
};

// =============================================================================
// RE-EXPORTS: Generation & Formats
// =============================================================================

pub use fingerprint::{PlanFingerprint, fingerprint_plans};
pub use formats::{PersistenceHeader, document_from_bytes, document_to_bytes};
pub use generation::{GenerationInputs, GenerationReport, generate};
