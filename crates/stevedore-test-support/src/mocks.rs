//! Scripted providers and a recording sleeper.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use stevedore_provider::{Sleeper, TransferProvider};

/// Single scripted response for a transfer call.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Report success; downloads also write the destination file.
    Success,
    /// Report an ordinary, retryable failure.
    Failure,
    /// Fail with an unexpected error carrying this message.
    Abort(String),
}

/// One recorded batch lifecycle invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    /// Destination identifiers, in group order.
    pub destinations: Vec<String>,
    /// Local sources, in group order.
    pub sources: Vec<PathBuf>,
    /// Per-file metadata, in group order.
    pub metadata: Vec<Option<String>>,
}

/// Provider double driven by scripted outcomes.
///
/// Calls consume the relevant script front to back; an exhausted script
/// keeps reporting success. Successful downloads write the source identifier
/// as the destination's content, which makes repeated fetches of one logical
/// target byte-identical.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    schemes: HashSet<String>,
    download_script: Mutex<VecDeque<ScriptedOutcome>>,
    upload_script: Mutex<VecDeque<ScriptedOutcome>>,
    downloads: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, Option<String>)>>,
    prepared: Mutex<Vec<BatchCall>>,
    finalized: Mutex<Vec<BatchCall>>,
    configuration: Mutex<Option<HashMap<String, String>>>,
}

impl ScriptedProvider {
    /// Provider double claiming the given schemes.
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemes: schemes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Queue outcomes for upcoming download calls.
    ///
    /// # Panics
    ///
    /// Panics when the internal script mutex is poisoned.
    pub fn script_downloads(&self, outcomes: Vec<ScriptedOutcome>) {
        self.download_script
            .lock()
            .expect("download script mutex poisoned")
            .extend(outcomes);
    }

    /// Queue outcomes for upcoming upload calls.
    ///
    /// # Panics
    ///
    /// Panics when the internal script mutex is poisoned.
    pub fn script_uploads(&self, outcomes: Vec<ScriptedOutcome>) {
        self.upload_script
            .lock()
            .expect("upload script mutex poisoned")
            .extend(outcomes);
    }

    /// Number of download calls observed.
    ///
    /// # Panics
    ///
    /// Panics when the internal record mutex is poisoned.
    #[must_use]
    pub fn download_calls(&self) -> usize {
        self.downloads
            .lock()
            .expect("download record mutex poisoned")
            .len()
    }

    /// Number of upload calls observed.
    ///
    /// # Panics
    ///
    /// Panics when the internal record mutex is poisoned.
    #[must_use]
    pub fn upload_calls(&self) -> usize {
        self.uploads
            .lock()
            .expect("upload record mutex poisoned")
            .len()
    }

    /// Destinations passed to `upload_to`, in call order.
    ///
    /// # Panics
    ///
    /// Panics when the internal record mutex is poisoned.
    #[must_use]
    pub fn uploaded_destinations(&self) -> Vec<String> {
        self.uploads
            .lock()
            .expect("upload record mutex poisoned")
            .iter()
            .map(|(destination, _)| destination.clone())
            .collect()
    }

    /// Metadata passed to `upload_to`, in call order.
    ///
    /// # Panics
    ///
    /// Panics when the internal record mutex is poisoned.
    #[must_use]
    pub fn uploaded_metadata(&self) -> Vec<Option<String>> {
        self.uploads
            .lock()
            .expect("upload record mutex poisoned")
            .iter()
            .map(|(_, metadata)| metadata.clone())
            .collect()
    }

    /// Recorded `prepare_file_set` invocations.
    ///
    /// # Panics
    ///
    /// Panics when the internal record mutex is poisoned.
    #[must_use]
    pub fn prepared_sets(&self) -> Vec<BatchCall> {
        self.prepared
            .lock()
            .expect("prepare record mutex poisoned")
            .clone()
    }

    /// Recorded `finalize_file_set` invocations.
    ///
    /// # Panics
    ///
    /// Panics when the internal record mutex is poisoned.
    #[must_use]
    pub fn finalized_sets(&self) -> Vec<BatchCall> {
        self.finalized
            .lock()
            .expect("finalize record mutex poisoned")
            .clone()
    }

    /// Settings injected through `set_configuration`, when any.
    ///
    /// # Panics
    ///
    /// Panics when the internal record mutex is poisoned.
    #[must_use]
    pub fn configuration(&self) -> Option<HashMap<String, String>> {
        self.configuration
            .lock()
            .expect("configuration mutex poisoned")
            .clone()
    }

    fn next_outcome(script: &Mutex<VecDeque<ScriptedOutcome>>) -> ScriptedOutcome {
        script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or(ScriptedOutcome::Success)
    }
}

#[async_trait]
impl TransferProvider for ScriptedProvider {
    fn schemes_handled(&self) -> HashSet<String> {
        self.schemes.clone()
    }

    async fn download_from(&self, source: &str, destination: &Path) -> anyhow::Result<bool> {
        self.downloads
            .lock()
            .expect("download record mutex poisoned")
            .push(source.to_string());
        match Self::next_outcome(&self.download_script) {
            ScriptedOutcome::Success => {
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(destination, source.as_bytes())?;
                Ok(true)
            }
            ScriptedOutcome::Failure => Ok(false),
            ScriptedOutcome::Abort(message) => Err(anyhow!(message)),
        }
    }

    async fn upload_to(
        &self,
        destination: &str,
        _source: &Path,
        metadata: Option<&str>,
    ) -> anyhow::Result<bool> {
        self.uploads
            .lock()
            .expect("upload record mutex poisoned")
            .push((destination.to_string(), metadata.map(ToString::to_string)));
        match Self::next_outcome(&self.upload_script) {
            ScriptedOutcome::Success => Ok(true),
            ScriptedOutcome::Failure => Ok(false),
            ScriptedOutcome::Abort(message) => Err(anyhow!(message)),
        }
    }

    async fn prepare_file_set(
        &self,
        destinations: &[String],
        sources: &[PathBuf],
        metadata: &[Option<String>],
    ) -> anyhow::Result<()> {
        self.prepared
            .lock()
            .expect("prepare record mutex poisoned")
            .push(BatchCall {
                destinations: destinations.to_vec(),
                sources: sources.to_vec(),
                metadata: metadata.to_vec(),
            });
        Ok(())
    }

    async fn finalize_file_set(
        &self,
        destinations: &[String],
        sources: &[PathBuf],
        metadata: &[Option<String>],
    ) -> anyhow::Result<()> {
        self.finalized
            .lock()
            .expect("finalize record mutex poisoned")
            .push(BatchCall {
                destinations: destinations.to_vec(),
                sources: sources.to_vec(),
                metadata: metadata.to_vec(),
            });
        Ok(())
    }

    fn set_configuration(&mut self, settings: &HashMap<String, String>) {
        *self
            .configuration
            .lock()
            .expect("configuration mutex poisoned") = Some(settings.clone());
    }
}

/// Sleeper that records requested intervals instead of waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    intervals: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Intervals requested so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics when the internal record mutex is poisoned.
    #[must_use]
    pub fn intervals(&self) -> Vec<Duration> {
        self.intervals
            .lock()
            .expect("interval record mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, interval: Duration) {
        self.intervals
            .lock()
            .expect("interval record mutex poisoned")
            .push(interval);
    }
}
