//! Bounded exponential backoff around provider transfers.
//!
//! A provider reports ordinary transfer failures as `Ok(false)`; only those
//! are retried. An `Err(_)` from the provider is unexpected, propagates
//! immediately, and is never retried. Waits go through the injectable
//! [`Sleeper`] so tests can observe the schedule without real delays.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use stevedore_provider::{Sleeper, TransferProvider};
use tracing::{error, warn};

use crate::error::{ProvisionError, ProvisionResult};

/// Base multiplier for the backoff schedule, in milliseconds.
const RETRY_MULTIPLIER_MS: u64 = 100;

/// Wait applied before retry `retry` (1-indexed): `2^retry * 100ms`.
///
/// The initial attempt carries no wait; the schedule is purely exponential
/// with no jitter and no cap.
#[must_use]
pub const fn backoff_interval(retry: u32) -> Duration {
    Duration::from_millis(2_u64.pow(retry) * RETRY_MULTIPLIER_MS)
}

/// Retry bound for one provisioning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Policy allowing `max_retries` retries after the initial attempt.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Total number of attempts the policy permits.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// Direction of a provider transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferDirection {
    /// Remote to local.
    Download,
    /// Local to remote.
    Upload,
}

impl TransferDirection {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }
}

/// Drive one provider transfer to success or terminal failure.
///
/// `target` is the remote identifier and `local` the workspace file; for
/// uploads the optional `metadata` is forwarded to the provider untouched.
pub(crate) async fn transfer_with_retry(
    provider: &dyn TransferProvider,
    target: &str,
    local: &Path,
    direction: TransferDirection,
    metadata: Option<&str>,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
) -> ProvisionResult<()> {
    let mut retries: u32 = 0;
    loop {
        if retries > 0 {
            let wait = backoff_interval(retries);
            warn!(
                wait_ms = wait.as_millis() as u64,
                retry = retries,
                "waiting before transfer retry"
            );
            sleeper.sleep(wait).await;
        }
        let success = match direction {
            TransferDirection::Download => provider.download_from(target, local).await,
            TransferDirection::Upload => provider.upload_to(target, local, metadata).await,
        }
        .map_err(|source| ProvisionError::provider(direction.as_str(), target, source))?;

        if success {
            return Ok(());
        }
        error!(
            target_url = target,
            local = %local.display(),
            retry = retries,
            "could not provision file"
        );
        if retries >= policy.max_retries {
            return Err(ProvisionError::RetryExhausted {
                target: target.to_string(),
                destination: local.to_path_buf(),
                attempts: policy.max_attempts(),
            });
        }
        retries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Arc;
    use stevedore_test_support::mocks::{RecordingSleeper, ScriptedOutcome, ScriptedProvider};
    use tempfile::TempDir;

    type TestResult<T> = Result<T>;

    fn temp_dir() -> TestResult<TempDir> {
        Ok(tempfile::Builder::new().prefix("stevedore-").tempdir()?)
    }

    #[test]
    fn backoff_schedule_is_exponential_from_the_first_retry() {
        assert_eq!(backoff_interval(1), Duration::from_millis(200));
        assert_eq!(backoff_interval(2), Duration::from_millis(400));
        assert_eq!(backoff_interval(3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn persistent_failure_exhausts_the_retry_bound() -> TestResult<()> {
        let temp = temp_dir()?;
        let provider = ScriptedProvider::new(["mem"]);
        provider.script_downloads(vec![ScriptedOutcome::Failure; 8]);
        let sleeper = RecordingSleeper::default();

        let err = transfer_with_retry(
            &provider,
            "mem://bucket/key",
            &temp.path().join("in.txt"),
            TransferDirection::Download,
            None,
            RetryPolicy::new(3),
            &sleeper,
        )
        .await
        .expect_err("persistent failure must exhaust retries");

        assert!(matches!(
            err,
            ProvisionError::RetryExhausted { attempts: 4, .. }
        ));
        assert_eq!(provider.download_calls(), 4);
        assert_eq!(
            sleeper.intervals(),
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn transient_failures_recover_within_the_bound() -> TestResult<()> {
        let temp = temp_dir()?;
        let destination = temp.path().join("in.txt");
        let provider = ScriptedProvider::new(["mem"]);
        provider.script_downloads(vec![
            ScriptedOutcome::Failure,
            ScriptedOutcome::Failure,
            ScriptedOutcome::Success,
        ]);
        let sleeper = RecordingSleeper::default();

        transfer_with_retry(
            &provider,
            "mem://bucket/key",
            &destination,
            TransferDirection::Download,
            None,
            RetryPolicy::new(3),
            &sleeper,
        )
        .await?;

        assert_eq!(provider.download_calls(), 3);
        assert!(destination.is_file());
        Ok(())
    }

    #[tokio::test]
    async fn unexpected_provider_errors_are_never_retried() -> TestResult<()> {
        let temp = temp_dir()?;
        let provider = ScriptedProvider::new(["mem"]);
        provider.script_downloads(vec![ScriptedOutcome::Abort("wire torn".to_string())]);
        let sleeper = RecordingSleeper::default();

        let err = transfer_with_retry(
            &provider,
            "mem://bucket/key",
            &temp.path().join("in.txt"),
            TransferDirection::Download,
            None,
            RetryPolicy::new(3),
            &sleeper,
        )
        .await
        .expect_err("an unexpected error must abort the transfer");

        assert!(matches!(err, ProvisionError::Provider { .. }));
        assert_eq!(provider.download_calls(), 1);
        assert!(sleeper.intervals().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn uploads_forward_metadata_to_the_provider() -> TestResult<()> {
        let temp = temp_dir()?;
        let source = temp.path().join("out.txt");
        std::fs::write(&source, b"result")?;
        let provider = Arc::new(ScriptedProvider::new(["mem"]));

        transfer_with_retry(
            provider.as_ref(),
            "mem://bucket/out.txt",
            &source,
            TransferDirection::Upload,
            Some("tag=alpha"),
            RetryPolicy::new(0),
            &RecordingSleeper::default(),
        )
        .await?;

        assert_eq!(provider.upload_calls(), 1);
        assert_eq!(
            provider.uploaded_metadata(),
            vec![Some("tag=alpha".to_string())]
        );
        Ok(())
    }
}
