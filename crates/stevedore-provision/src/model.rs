//! Data carriers exchanged between workflow clients and the engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Describes a single file to provision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileInfo {
    /// Filesystem path on the local side of the transfer.
    pub local_path: String,
    /// Logical source/destination identifier; a URI with scheme for remote
    /// targets, a bare path for local ones.
    pub url: String,
    /// Opaque string forwarded to the provider, never interpreted here.
    pub metadata: Option<String>,
    /// Whether the target is a directory tree rather than a single file.
    pub directory: bool,
}

/// An output registered for upload: the local source plus its descriptor.
///
/// Registration order is preserved and determines emission order within one
/// provider group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredOutput {
    /// Local file or directory produced by the workflow.
    pub source: PathBuf,
    /// Destination descriptor for the upload.
    pub info: FileInfo,
}
