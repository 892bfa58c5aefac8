//! Engine-agnostic transfer-provider contract.
//!
//! External storage plugins implement [`TransferProvider`]; the provisioning
//! engine only ever talks to them through this trait. Ordinary transfer
//! failures are reported as `Ok(false)` so the engine can retry them;
//! `Err(_)` is reserved for unexpected conditions and is never retried.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

/// A storage backend capable of moving files for one or more URI schemes.
#[async_trait]
pub trait TransferProvider: Send + Sync {
    /// Schemes claimed by this provider. Matching is case-insensitive.
    fn schemes_handled(&self) -> HashSet<String>;

    /// Fetch `source` into the local file at `destination`.
    ///
    /// Returns `Ok(true)` on success and `Ok(false)` for an ordinary transfer
    /// failure that may be retried. Unexpected failures surface as `Err(_)`.
    async fn download_from(&self, source: &str, destination: &Path) -> anyhow::Result<bool>;

    /// Push the local file at `source` to the remote `destination`.
    ///
    /// Same success/failure contract as [`TransferProvider::download_from`];
    /// `metadata` is an opaque string forwarded untouched from the caller.
    async fn upload_to(
        &self,
        destination: &str,
        source: &Path,
        metadata: Option<&str>,
    ) -> anyhow::Result<bool>;

    /// Called once before the per-file uploads of a batch destined for this
    /// provider, with the full ordered destination, source, and metadata
    /// lists for the group.
    async fn prepare_file_set(
        &self,
        _destinations: &[String],
        _sources: &[PathBuf],
        _metadata: &[Option<String>],
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once after the per-file uploads of a batch, with the same lists
    /// that were passed to [`TransferProvider::prepare_file_set`].
    async fn finalize_file_set(
        &self,
        _destinations: &[String],
        _sources: &[PathBuf],
        _metadata: &[Option<String>],
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// One-shot configuration injection, performed by whatever discovers and
    /// constructs the provider before it is handed to the engine.
    fn set_configuration(&mut self, settings: &HashMap<String, String>);
}

/// Delay hook used between transfer retries.
///
/// Production code sleeps on the runtime timer; tests substitute a recording
/// no-op so retry schedules can be asserted without wall-clock waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the calling task for `interval`.
    async fn sleep(&self, interval: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct NullProvider;

    #[async_trait]
    impl TransferProvider for NullProvider {
        fn schemes_handled(&self) -> HashSet<String> {
            HashSet::new()
        }

        async fn download_from(&self, _source: &str, _destination: &Path) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn upload_to(
            &self,
            _destination: &str,
            _source: &Path,
            _metadata: Option<&str>,
        ) -> anyhow::Result<bool> {
            Ok(false)
        }

        fn set_configuration(&mut self, _settings: &HashMap<String, String>) {}
    }

    #[tokio::test]
    async fn batch_hooks_default_to_no_ops() -> anyhow::Result<()> {
        let provider = NullProvider;
        let destinations = vec!["mem://bucket/file".to_string()];
        let sources = vec![PathBuf::from("/tmp/file")];
        let metadata = vec![None];
        provider
            .prepare_file_set(&destinations, &sources, &metadata)
            .await?;
        provider
            .finalize_file_set(&destinations, &sources, &metadata)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn provider_objects_are_usable_behind_dyn() -> anyhow::Result<()> {
        let provider: Box<dyn TransferProvider> = Box::new(NullProvider);
        assert!(provider.schemes_handled().is_empty());
        assert!(!provider.download_from("mem://x", Path::new("/tmp/x")).await?);
        Ok(())
    }
}
