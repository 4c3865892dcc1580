//! # Input and Output Files
//!
//! Everything that touches the filesystem: graph snapshots (JSON or binary),
//! descriptor snapshots, the suppression file and the plan report.

use depsync_core::{
    DependencyGraph, DepsyncError, DescriptorSet, GraphDocument, MemoizedDescriptorProvider,
    SuppressionConfig, document_from_bytes, document_to_bytes, primitives::MAGIC_BYTES,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum graph snapshot size (500 MB).
const MAX_GRAPH_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Maximum descriptor set size (200 MB).
const MAX_DESCRIPTOR_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Maximum suppression file size (50 MB).
const MAX_SUPPRESSION_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), DepsyncError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| DepsyncError::IoError(format!("Cannot read file metadata: {e}")))?;

    if metadata.len() > max_size {
        return Err(DepsyncError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, DepsyncError> {
    let canonical = path.canonicalize().map_err(|e| {
        DepsyncError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(DepsyncError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against an existing parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, DepsyncError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        DepsyncError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(DepsyncError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| DepsyncError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn read_bytes(path: &Path, max_size: u64) -> Result<Vec<u8>, DepsyncError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, max_size)?;
    std::fs::read(&path).map_err(|e| DepsyncError::IoError(format!("{}: {e}", path.display())))
}

/// Read a UTF-8 file after path and size validation.
pub fn read_text(path: &Path, max_size: u64) -> Result<String, DepsyncError> {
    let bytes = read_bytes(path, max_size)?;
    String::from_utf8(bytes).map_err(|e| {
        DepsyncError::DeserializationError(format!("{} is not UTF-8: {e}", path.display()))
    })
}

fn write_text(path: &Path, content: &str) -> Result<(), DepsyncError> {
    let path = validate_output_path(path)?;
    std::fs::write(&path, content)
        .map_err(|e| DepsyncError::IoError(format!("{}: {e}", path.display())))
}

// =============================================================================
// GRAPH
// =============================================================================

/// Decode a graph document; binary snapshots are recognized by their magic bytes.
pub fn decode_graph_document(bytes: &[u8]) -> Result<GraphDocument, DepsyncError> {
    if bytes.starts_with(MAGIC_BYTES) {
        return document_from_bytes(bytes);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| DepsyncError::DeserializationError(format!("Invalid graph document: {e}")))
}

/// Load and build the dependency graph.
pub fn load_graph(path: &Path) -> Result<DependencyGraph, DepsyncError> {
    let bytes = read_bytes(path, MAX_GRAPH_FILE_SIZE)?;
    let document = decode_graph_document(&bytes)?;
    let graph = DependencyGraph::try_from(document)?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        "loaded dependency graph"
    );
    Ok(graph)
}

/// Convert a graph file (JSON or binary) into a binary snapshot.
///
/// The graph is rebuilt first so an invalid document is never persisted.
/// Returns the snapshot size in bytes.
pub fn write_graph_snapshot(input: &Path, output: &Path) -> Result<usize, DepsyncError> {
    let graph = load_graph(input)?;
    let bytes = document_to_bytes(&GraphDocument::from(&graph))?;
    let output = validate_output_path(output)?;
    std::fs::write(&output, &bytes)
        .map_err(|e| DepsyncError::IoError(format!("{}: {e}", output.display())))?;
    Ok(bytes.len())
}

// =============================================================================
// DESCRIPTORS & SUPPRESSIONS
// =============================================================================

/// Load descriptor snapshots behind a memoizing provider.
pub fn load_descriptors(
    path: &Path,
) -> Result<MemoizedDescriptorProvider<DescriptorSet>, DepsyncError> {
    let content = read_text(path, MAX_DESCRIPTOR_FILE_SIZE)?;
    let set: DescriptorSet = serde_json::from_str(&content)
        .map_err(|e| DepsyncError::DeserializationError(format!("Invalid descriptor set: {e}")))?;
    tracing::info!(
        path = %path.display(),
        modules = set.modules.len(),
        plugins = set.plugins.len(),
        "loaded descriptor snapshots"
    );
    Ok(MemoizedDescriptorProvider::new(set))
}

/// Load the suppression file. A missing file is an empty config.
pub fn load_suppressions(path: &Path) -> Result<SuppressionConfig, DepsyncError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no suppression file, starting empty");
        return Ok(SuppressionConfig::new());
    }
    let content = read_text(path, MAX_SUPPRESSION_FILE_SIZE)?;
    let config = SuppressionConfig::from_json(&content)?;
    tracing::info!(
        path = %path.display(),
        entries = config.entry_count(),
        "loaded suppressions"
    );
    Ok(config)
}

/// Write the suppression file with a trailing newline.
pub fn write_suppressions(path: &Path, config: &SuppressionConfig) -> Result<(), DepsyncError> {
    let mut json = config.to_json_pretty()?;
    json.push('\n');
    write_text(path, &json)?;
    tracing::info!(path = %path.display(), entries = config.entry_count(), "wrote suppressions");
    Ok(())
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), DepsyncError> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| DepsyncError::SerializationError(e.to_string()))?;
    json.push('\n');
    write_text(path, &json)
}
