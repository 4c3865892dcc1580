//! Library-module allow-predicate.
//!
//! Only modules carrying the library prefix are ever asked; every other
//! content module is always allowed.

use crate::types::ContentModuleName;
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Decides whether a library module may appear as a generated dependency.
pub trait LibraryFilter: Debug + Send + Sync {
    fn allows(&self, library: &ContentModuleName) -> bool;
}

/// Accepts every library module.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllLibraries;

impl LibraryFilter for AllowAllLibraries {
    fn allows(&self, _library: &ContentModuleName) -> bool {
        true
    }
}

/// Explicit allow/deny lists.
///
/// An empty `allow` list admits every library not in `deny`. `deny` always wins.
#[derive(Debug, Clone, Default)]
pub struct LibraryAllowList {
    allow: BTreeSet<ContentModuleName>,
    deny: BTreeSet<ContentModuleName>,
}

impl LibraryAllowList {
    #[must_use]
    pub fn new(
        allow: impl IntoIterator<Item = ContentModuleName>,
        deny: impl IntoIterator<Item = ContentModuleName>,
    ) -> Self {
        Self {
            allow: allow.into_iter().collect(),
            deny: deny.into_iter().collect(),
        }
    }
}

impl LibraryFilter for LibraryAllowList {
    fn allows(&self, library: &ContentModuleName) -> bool {
        if self.deny.contains(library) {
            return false;
        }
        self.allow.is_empty() || self.allow.contains(library)
    }
}

/// Whether a classified module dependency passes the library predicate.
pub fn admits(filter: &dyn LibraryFilter, module: &ContentModuleName) -> bool {
    !module.is_library() || filter.allows(module)
}
