//! # Formats
//!
//! Pure byte-level encodings. File I/O lives in the binary.

pub mod persistence;

pub use persistence::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, document_from_bytes, document_to_bytes,
};
