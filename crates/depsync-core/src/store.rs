//! # Graph Store
//!
//! Holds the current graph snapshot behind an atomically swapped pointer.
//!
//! Readers take a cheap `Arc` clone and keep working on it while a writer
//! builds the next snapshot. The write lock is only held for the pointer
//! swap, never during construction.

use crate::graph::DependencyGraph;
use crate::types::DepsyncError;
use parking_lot::RwLock;
use std::sync::Arc;

/// Copy-on-write holder of the current `DependencyGraph`.
#[derive(Debug, Default)]
pub struct GraphStore {
    current: RwLock<Arc<DependencyGraph>>,
}

impl GraphStore {
    /// Create a store around an initial snapshot.
    #[must_use]
    pub fn new(graph: DependencyGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(graph)),
        }
    }

    /// The current snapshot. It never changes under the caller.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DependencyGraph> {
        Arc::clone(&self.current.read())
    }

    /// Build a new snapshot from the current one and swap it in.
    ///
    /// `build` receives a private copy. If it fails, the current snapshot is
    /// left untouched.
    pub fn replace_with<F>(&self, build: F) -> Result<Arc<DependencyGraph>, DepsyncError>
    where
        F: FnOnce(&mut DependencyGraph) -> Result<(), DepsyncError>,
    {
        let base = self.snapshot();
        let mut next = DependencyGraph::clone(&base);
        build(&mut next)?;
        let next = Arc::new(next);

        let mut guard = self.current.write();
        if !Arc::ptr_eq(&guard, &base) {
            tracing::warn!("graph snapshot replaced concurrently; last writer wins");
        }
        *guard = Arc::clone(&next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphQuery;
    use crate::types::ContentModuleName;

    #[test]
    fn readers_keep_their_snapshot() {
        let store = GraphStore::new(DependencyGraph::new());
        let before = store.snapshot();

        store
            .replace_with(|graph| {
                graph.add_orphan_module(ContentModuleName::new("orphan"))?;
                Ok(())
            })
            .expect("swap");

        assert_eq!(before.node_count(), 0);
        let after = store.snapshot();
        assert!(after.content_module(&ContentModuleName::new("orphan")).is_some());
    }

    #[test]
    fn failed_build_leaves_snapshot_untouched() {
        let store = GraphStore::new(DependencyGraph::new());
        let result = store.replace_with(|graph| {
            graph.add_orphan_module(ContentModuleName::new("half"))?;
            Err(DepsyncError::NodeNotFound("missing".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.snapshot().node_count(), 0);
    }
}
