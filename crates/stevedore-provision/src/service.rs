//! Session-level entry point tying the engine together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stevedore_provider::Sleeper;
use tracing::info;

use crate::batch;
use crate::cache::FileCache;
use crate::config::ProvisionConfig;
use crate::dispatch::{ProviderSet, scheme_of};
use crate::error::ProvisionResult;
use crate::fallback::FallbackTransfer;
use crate::linker;
use crate::model::{FileInfo, RegisteredOutput};
use crate::retry::{RetryPolicy, TokioSleeper, TransferDirection, transfer_with_retry};

/// Stages inputs into a workspace and pushes registered outputs back out.
///
/// One instance serves one provisioning session: outputs accumulate through
/// [`FileProvisioner::register_output_file`] and are drained by a single
/// [`FileProvisioner::upload_files`] call at flush time.
pub struct FileProvisioner {
    config: ProvisionConfig,
    providers: ProviderSet,
    fallback: FallbackTransfer,
    registered: Vec<RegisteredOutput>,
    sleeper: Arc<dyn Sleeper>,
}

impl FileProvisioner {
    /// Build a session over an externally discovered provider set.
    #[must_use]
    pub fn new(config: ProvisionConfig, providers: ProviderSet) -> Self {
        Self::with_sleeper(config, providers, Arc::new(TokioSleeper))
    }

    /// Build a session with a custom retry delay hook.
    #[must_use]
    pub fn with_sleeper(
        config: ProvisionConfig,
        providers: ProviderSet,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            providers,
            fallback: FallbackTransfer,
            registered: Vec::new(),
            sleeper,
        }
    }

    /// Configuration the session was built with.
    #[must_use]
    pub const fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    const fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.retries)
    }

    /// Stage one input, local or remote, into the workspace at `destination`.
    ///
    /// With caching enabled, a cached copy of `target` is linked into place
    /// first and a freshly fetched file is recorded afterwards; directories
    /// never touch the cache. Remote targets go through every matching
    /// provider's retried download, then the fallback transfer if the file is
    /// still absent; schemeless targets are hard-linked or copied locally.
    ///
    /// # Errors
    ///
    /// Returns the first terminal failure: retry exhaustion, an unexpected
    /// provider error, or a local link/copy that could not be completed.
    pub async fn provision_input_file(
        &self,
        target: &str,
        destination: &Path,
    ) -> ProvisionResult<()> {
        let cache = self
            .config
            .use_cache
            .then(|| FileCache::new(self.config.cache_dir.clone()));

        if let Some(cache) = &cache {
            cache.ensure_root()?;
            if let Some(slot) = cache.lookup(target) {
                info!(target_url = target, "found input in cache, hard-linking");
                FileCache::materialize(&slot, destination)?;
            }
        }

        if !destination.exists() {
            let matched = self.providers.resolve(target);
            for provider in &matched {
                info!(target_url = target, "calling provider to provision input");
                transfer_with_retry(
                    provider.as_ref(),
                    target,
                    destination,
                    TransferDirection::Download,
                    None,
                    self.policy(),
                    self.sleeper.as_ref(),
                )
                .await?;
            }

            if !destination.exists() {
                if scheme_of(target).is_some() {
                    transfer_with_retry(
                        &self.fallback,
                        target,
                        destination,
                        TransferDirection::Download,
                        None,
                        self.policy(),
                        self.sleeper.as_ref(),
                    )
                    .await?;
                } else {
                    linker::place(target, destination)?;
                }
            }
        }

        if let Some(cache) = &cache
            && !destination.is_dir()
        {
            FileCache::populate(&cache.slot_for(target), destination);
        }
        Ok(())
    }

    /// Register one output for the next [`FileProvisioner::upload_files`]
    /// flush.
    pub fn register_output_file(&mut self, source: impl Into<PathBuf>, info: FileInfo) {
        self.registered.push(RegisteredOutput {
            source: source.into(),
            info,
        });
    }

    /// Outputs registered so far, in registration order.
    #[must_use]
    pub fn registered_outputs(&self) -> &[RegisteredOutput] {
        &self.registered
    }

    /// Deliver every registered output through its provider's batch
    /// lifecycle, draining the session's registration list.
    ///
    /// # Errors
    ///
    /// The first hook failure or terminal per-file failure aborts the whole
    /// flush; remaining files and groups are not attempted.
    pub async fn upload_files(&mut self) -> ProvisionResult<()> {
        let outputs = std::mem::take(&mut self.registered);
        let groups = batch::partition(&outputs, &self.providers);
        batch::flush(groups, self.policy(), self.sleeper.as_ref()).await
    }
}
