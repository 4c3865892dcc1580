//! # Snapshot Format
//!
//! Binary encoding of a `GraphDocument`.
//!
//! Format: Header (5 bytes) + postcard-serialized document.
//! - 4 bytes: Magic ("DPSG")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is parsed.

use crate::graph::GraphDocument;
use crate::primitives;
use crate::types::DepsyncError;

/// Maximum accepted snapshot size.
///
/// Checked before deserialization so a corrupted length prefix cannot
/// trigger a huge allocation.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 256 * 1024 * 1024; // 256 MB

const HEADER_LEN: usize = 5;

/// The header that precedes every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), DepsyncError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(DepsyncError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(DepsyncError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DepsyncError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(DepsyncError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a document as header + payload.
pub fn document_to_bytes(document: &GraphDocument) -> Result<Vec<u8>, DepsyncError> {
    let payload = postcard::to_stdvec(document)
        .map_err(|e| DepsyncError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a document, validating size and header first.
pub fn document_from_bytes(bytes: &[u8]) -> Result<GraphDocument, DepsyncError> {
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(DepsyncError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_LEN..).unwrap_or_default();
    postcard::from_bytes(payload).map_err(|e| {
        DepsyncError::DeserializationError(format!("Failed to decode graph snapshot: {e}"))
    })
}
