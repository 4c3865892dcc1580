//! # Plan Fingerprint
//!
//! Canonical bytes of every plan in a run, plus a checksum over them.
//!
//! Two runs over the same graph, descriptors and suppressions must produce
//! the same fingerprint. The postcard stream is the source of truth; the
//! checksum is a cheap way to compare it.

use crate::planner::{DependencyPlan, PluginDependencyPlan, TestPluginDependencyPlan};
use crate::types::DepsyncError;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct CanonicalPlans<'a> {
    content_modules: &'a [DependencyPlan],
    plugins: &'a [PluginDependencyPlan],
    test_plugins: &'a [TestPluginDependencyPlan],
}

/// Fingerprint of all plans of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFingerprint {
    /// Length of the canonical byte stream.
    pub byte_len: u64,
    /// XOR-fold checksum of the canonical byte stream.
    pub checksum: u64,
    /// BLAKE3 hex digest, when built with `crypto-hash`.
    pub blake3: Option<String>,
}

/// Canonical postcard encoding of all plans. Plans must already be sorted.
pub fn canonical_plan_bytes(
    content_modules: &[DependencyPlan],
    plugins: &[PluginDependencyPlan],
    test_plugins: &[TestPluginDependencyPlan],
) -> Result<Vec<u8>, DepsyncError> {
    postcard::to_stdvec(&CanonicalPlans {
        content_modules,
        plugins,
        test_plugins,
    })
    .map_err(|e| DepsyncError::SerializationError(e.to_string()))
}

/// XOR-fold checksum with position-dependent rotation.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0;
    for (index, byte) in bytes.iter().enumerate() {
        // Rotation keeps equal bytes at different offsets from cancelling out.
        let rotation = u32::try_from(index % 64).unwrap_or(0);
        hash ^= u64::from(*byte).rotate_left(rotation);
        hash = hash.rotate_left(7);
    }
    hash ^ (bytes.len() as u64).rotate_left(3)
}

/// Fingerprint a run's plans.
pub fn fingerprint_plans(
    content_modules: &[DependencyPlan],
    plugins: &[PluginDependencyPlan],
    test_plugins: &[TestPluginDependencyPlan],
) -> Result<PlanFingerprint, DepsyncError> {
    let bytes = canonical_plan_bytes(content_modules, plugins, test_plugins)?;
    Ok(PlanFingerprint {
        byte_len: bytes.len() as u64,
        checksum: checksum(&bytes),
        blake3: crypto_hash(&bytes),
    })
}

#[cfg(feature = "crypto-hash")]
fn crypto_hash(bytes: &[u8]) -> Option<String> {
    Some(blake3::hash(bytes).to_hex().to_string())
}

#[cfg(not(feature = "crypto-hash"))]
fn crypto_hash(_bytes: &[u8]) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic() {
        assert_eq!(checksum(b"abc"), checksum(b"abc"));
        assert_ne!(checksum(b"abc"), checksum(b"acb"));
        assert_ne!(checksum(b""), checksum(b"\0"));
    }

    #[test]
    fn empty_run_fingerprint_is_stable() {
        let first = fingerprint_plans(&[], &[], &[]).expect("first");
        let second = fingerprint_plans(&[], &[], &[]).expect("second");
        assert_eq!(first, second);
        assert_eq!(first.blake3.is_some(), cfg!(feature = "crypto-hash"));
    }
}
