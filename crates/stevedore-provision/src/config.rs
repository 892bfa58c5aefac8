//! Session configuration for the provisioning engine.
//!
//! The engine never parses configuration files itself; the surrounding
//! application hands it a flat string-to-string settings mapping and this
//! module interprets the keys the engine cares about. The resulting struct is
//! constructed once per provisioning session and passed to every component
//! that needs it.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

/// Settings key naming the cache directory.
const CACHE_DIR_KEY: &str = "cache-dir";
/// Settings key toggling the input cache.
const USE_CACHE_KEY: &str = "use-cache";
/// Settings key bounding transfer retries.
const RETRIES_KEY: &str = "file-provision-retries";

/// Retry bound applied when the settings mapping carries no override.
const DEFAULT_RETRIES: u32 = 3;

/// Values accepted as "cache on", compared case-insensitively.
const TRUTHY_VALUES: &[&str] = &["true", "use", "t"];

/// Per-session knobs consumed by the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    /// Root directory of the sharded input cache.
    pub cache_dir: PathBuf,
    /// Whether input downloads consult and populate the cache.
    pub use_cache: bool,
    /// Number of retries after the initial transfer attempt.
    pub retries: u32,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self::from_settings(&HashMap::new())
    }
}

impl ProvisionConfig {
    /// Interpret an externally supplied settings mapping.
    ///
    /// Unknown keys are ignored; a malformed retry count falls back to the
    /// default with a warning rather than failing the session.
    #[must_use]
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let cache_dir = settings
            .get(CACHE_DIR_KEY)
            .map_or_else(default_cache_dir, PathBuf::from);
        let use_cache = settings.get(USE_CACHE_KEY).is_some_and(|value| is_truthy(value));
        let retries = settings.get(RETRIES_KEY).map_or(DEFAULT_RETRIES, |raw| {
            raw.parse().unwrap_or_else(|_| {
                warn!(value = raw.as_str(), "invalid retry count in settings, using default");
                DEFAULT_RETRIES
            })
        });
        Self {
            cache_dir,
            use_cache,
            retries,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    TRUTHY_VALUES
        .iter()
        .any(|truthy| value.eq_ignore_ascii_case(truthy))
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stevedore")
        .join("cache")
}
