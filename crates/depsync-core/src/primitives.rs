//! # Primitives
//!
//! Fixed naming conventions and limits used by the planners.
//!
//! These are compiled in and never configured at runtime. Anything a
//! product team may legitimately want to change lives in the run
//! configuration of the binary instead.

/// Name prefix that marks a content module as a library module.
///
/// Library modules wrap a third-party library and are subject to the
/// library allow-predicate during classification.
pub const LIBRARY_MODULE_PREFIX: &str = "intellij.libraries.";

/// Suffix of content modules whose descriptor is loaded in a test context.
///
/// Such modules compute their *production* view with test scope included.
pub const TEST_DESCRIPTOR_SUFFIX: &str = "._test";

/// Separator of slash-notation (virtual) module names, e.g. `a.b/extra`.
///
/// Slash-notation modules are layered onto another descriptor and never get
/// generated dependencies.
pub const SLASH_NOTATION_SEPARATOR: char = '/';

/// Default number of per-entity planning tasks in flight.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Upper bound for the planner fan-out, regardless of configuration.
pub const MAX_CONCURRENCY: usize = 256;

/// Magic bytes for the binary graph snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"DPSG";

/// Current binary snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

/// Clamp a requested concurrency to `1..=MAX_CONCURRENCY`.
#[must_use]
pub fn bounded_concurrency(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_clamped() {
        assert_eq!(bounded_concurrency(0), 1);
        assert_eq!(bounded_concurrency(4), 4);
        assert_eq!(bounded_concurrency(10_000), MAX_CONCURRENCY);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"DPSG");
    }
}
