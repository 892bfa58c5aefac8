//! Temp workspaces and file helpers for provisioning tests.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tempfile::TempDir;

/// Fresh temp directory with the shared test prefix.
///
/// # Errors
///
/// Fails when the temp directory cannot be created.
pub fn temp_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("stevedore-").tempdir()?)
}

/// Write `bytes` at `path`, creating missing parent directories.
///
/// # Errors
///
/// Fails when a parent directory or the file itself cannot be written.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}
