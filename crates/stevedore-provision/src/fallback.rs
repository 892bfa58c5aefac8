//! Built-in transfer used when no plugin claims a scheme.
//!
//! Downloads resolve the source to a local path (`file://` URIs or bare
//! paths) and copy it into place; failures surface as ordinary retryable
//! outcomes, matching the provider contract. Uploads are unsupported.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use stevedore_provider::TransferProvider;
use tracing::warn;

use crate::linker;

/// Generic filesystem-backed transfer of last resort.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackTransfer;

#[async_trait]
impl TransferProvider for FallbackTransfer {
    fn schemes_handled(&self) -> HashSet<String> {
        HashSet::new()
    }

    async fn download_from(&self, source: &str, destination: &Path) -> anyhow::Result<bool> {
        let resolved = linker::resolve_identifier(source);
        match linker::copy_tree(&resolved, destination) {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(
                    error = %err,
                    source = %resolved.display(),
                    "fallback transfer could not copy source"
                );
                Ok(false)
            }
        }
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
