//! # Design
//!
//! - Provide structured, constant-message errors for the provisioning engine.
//! - Capture operation context (paths, targets, attempt counts) to make
//!   failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors produced while staging inputs or delivering outputs.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// IO failures while interacting with the filesystem.
    #[error("provision io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures during recursive copies.
    #[error("provision walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Every transfer attempt for one file failed.
    #[error("file provisioning retries exhausted")]
    RetryExhausted {
        /// Logical identifier of the remote side of the transfer.
        target: String,
        /// Local file involved in the transfer.
        destination: PathBuf,
        /// Number of attempts made before giving up.
        attempts: u32,
    },
    /// A provider failed in an unexpected way; never retried.
    #[error("transfer provider failure")]
    Provider {
        /// Provider operation that failed.
        operation: &'static str,
        /// Identifier the provider was working on.
        target: String,
        /// Underlying provider failure.
        source: Box<dyn Error + Send + Sync>,
    },
    /// Input validation failures.
    #[error("provision invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl ProvisionError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn provider(
        operation: &'static str,
        target: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Provider {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }
}
