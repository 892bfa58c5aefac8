//! Grouped upload lifecycle.
//!
//! Registered outputs are partitioned by the provider that will carry them;
//! each group runs `prepare_file_set` → per-file retried uploads →
//! `finalize_file_set`. Outputs claimed by no provider form a trailing group
//! delivered through a plain filesystem copy. Any failure aborts the whole
//! flush; later files and groups are not attempted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stevedore_provider::{Sleeper, TransferProvider};
use tracing::{debug, info};

use crate::dispatch::ProviderSet;
use crate::error::{ProvisionError, ProvisionResult};
use crate::linker;
use crate::model::RegisteredOutput;
use crate::retry::{RetryPolicy, TransferDirection, transfer_with_retry};

/// Outputs destined for one provider, in registration order.
pub(crate) struct ProviderGroup {
    pub(crate) provider: Option<Arc<dyn TransferProvider>>,
    pub(crate) outputs: Vec<RegisteredOutput>,
}

/// Partition outputs by resolved provider.
///
/// Dispatch is permissive: an output whose scheme is claimed by several
/// providers appears in each of their groups. Group order follows provider
/// registration order, with the no-provider bucket last.
pub(crate) fn partition(
    outputs: &[RegisteredOutput],
    providers: &ProviderSet,
) -> Vec<ProviderGroup> {
    let mut grouped: Vec<Vec<RegisteredOutput>> =
        (0..providers.len()).map(|_| Vec::new()).collect();
    let mut direct = Vec::new();
    for output in outputs {
        let indices = providers.resolve_indices(&output.info.url);
        if indices.is_empty() {
            direct.push(output.clone());
        } else {
            for index in indices {
                grouped[index].push(output.clone());
            }
        }
    }

    let mut groups: Vec<ProviderGroup> = grouped
        .into_iter()
        .enumerate()
        .map(|(index, outputs)| ProviderGroup {
            provider: Some(providers.get(index)),
            outputs,
        })
        .collect();
    groups.push(ProviderGroup {
        provider: None,
        outputs: direct,
    });
    groups
}

/// Final destination string for one output.
///
/// Directory outputs land inside their target location under the source's
/// base name; plain files use the destination verbatim.
pub(crate) fn destination_for(output: &RegisteredOutput) -> String {
    let target = output.info.url.clone();
    if !output.info.directory {
        return target;
    }
    let mut location = target;
    if !location.ends_with('/') {
        location.push('/');
    }
    let name = output
        .source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{location}{name}")
}

/// Drive every group through its provider's batch lifecycle.
pub(crate) async fn flush(
    groups: Vec<ProviderGroup>,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
) -> ProvisionResult<()> {
    for group in groups {
        if group.outputs.is_empty() {
            continue;
        }
        let destinations: Vec<String> = group.outputs.iter().map(destination_for).collect();
        let sources: Vec<PathBuf> = group
            .outputs
            .iter()
            .map(|output| output.source.clone())
            .collect();
        let metadata: Vec<Option<String>> = group
            .outputs
            .iter()
            .map(|output| output.info.metadata.clone())
            .collect();

        match group.provider {
            Some(ref provider) => {
                let anchor = destinations.first().cloned().unwrap_or_default();
                provider
                    .prepare_file_set(&destinations, &sources, &metadata)
                    .await
                    .map_err(|source| {
                        ProvisionError::provider("prepare_file_set", anchor.clone(), source)
                    })?;

                for (index, output) in group.outputs.iter().enumerate() {
                    if output.source.is_dir() {
                        // providers are not required to support directory upload
                        debug!(
                            source = %output.source.display(),
                            "skipping directory in provider upload"
                        );
                        continue;
                    }
                    info!(
                        source = %output.source.display(),
                        destination = destinations[index].as_str(),
                        "calling provider to provision output"
                    );
                    transfer_with_retry(
                        provider.as_ref(),
                        &destinations[index],
                        &output.source,
                        TransferDirection::Upload,
                        output.info.metadata.as_deref(),
                        policy,
                        sleeper,
                    )
                    .await?;
                }

                provider
                    .finalize_file_set(&destinations, &sources, &metadata)
                    .await
                    .map_err(|source| {
                        ProvisionError::provider("finalize_file_set", anchor, source)
                    })?;
            }
            None => {
                for (index, output) in group.outputs.iter().enumerate() {
                    copy_direct(&output.source, &destinations[index])?;
                }
            }
        }
    }
    Ok(())
}

/// Deliver one output without a provider: a plain filesystem copy, recursive
/// for directories.
fn copy_direct(source: &Path, destination: &str) -> ProvisionResult<()> {
    let destination_path = linker::resolve_identifier(destination);
    info!(
        source = %source.display(),
        destination = %destination_path.display(),
        "provisioning output directly"
    );
    linker::copy_tree(source, &destination_path)
}
