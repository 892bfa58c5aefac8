//! Sharded on-disk cache for provisioned input files.
//!
//! Slots are addressed by a hex digest of the logical target identifier, not
//! by file content: the same identifier always resolves to the same slot, and
//! two identifiers with identical bytes occupy distinct slots. The first two
//! hex characters become a shard directory to bound fan-out. Directories are
//! never cached.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{ProvisionError, ProvisionResult};

/// Handle on one cache directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Create a handle rooted at `root`. Nothing is touched on disk yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the cache root if it is missing.
    pub fn ensure_root(&self) -> ProvisionResult<()> {
        fs::create_dir_all(&self.root)
            .map_err(|source| ProvisionError::io("cache.create_root", &self.root, source))
    }

    /// Sharded slot path for a logical target identifier.
    #[must_use]
    pub fn slot_for(&self, target: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(target.as_bytes()));
        let (shard, rest) = digest.split_at(2);
        self.root.join(shard).join(rest)
    }

    /// Slot path for `target` when a cached copy exists on disk.
    #[must_use]
    pub fn lookup(&self, target: &str) -> Option<PathBuf> {
        let slot = self.slot_for(target);
        slot.is_file().then_some(slot)
    }

    /// Link a cached slot into place at `destination`, copying when the link
    /// fails (for example across devices). Both failing is terminal for the
    /// current file.
    pub fn materialize(slot: &Path, destination: &Path) -> ProvisionResult<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ProvisionError::io("cache.create_parent", parent, source))?;
        }
        match fs::hard_link(slot, destination) {
            Ok(()) => Ok(()),
            Err(link_err) => {
                warn!(
                    error = %link_err,
                    slot = %slot.display(),
                    "cannot hard-link cached file, copying instead"
                );
                fs::copy(slot, destination)
                    .map(|_| ())
                    .map_err(|source| ProvisionError::io("cache.copy", destination, source))
            }
        }
    }

    /// Record a freshly fetched file under `slot`, best-effort.
    ///
    /// An existing slot is left untouched; concurrent writers racing on the
    /// same slot fail the link and are swallowed the same way. The file has
    /// already been delivered to the caller, so nothing here is fatal.
    pub fn populate(slot: &Path, local: &Path) {
        if slot.exists() {
            return;
        }
        if let Some(parent) = slot.parent()
            && let Err(err) = fs::create_dir_all(parent)
        {
            warn!(
                error = %err,
                path = %parent.display(),
                "cannot create cache shard directory, skipping"
            );
            return;
        }
        info!(path = %local.display(), "caching file, hard-linking");
        if let Err(err) = fs::hard_link(local, slot) {
            warn!(
                error = %err,
                slot = %slot.display(),
                "cannot hard-link local file into cache, skipping"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::MetadataExt;

    type TestResult<T> = Result<T>;

    fn temp_dir() -> TestResult<TempDir> {
        Ok(tempfile::Builder::new().prefix("stevedore-").tempdir()?)
    }

    #[test]
    fn slots_are_deterministic_and_sharded() -> TestResult<()> {
        let temp = temp_dir()?;
        let cache = FileCache::new(temp.path());
        let first = cache.slot_for("mem://bucket/key");
        let second = cache.slot_for("mem://bucket/key");
        assert_eq!(first, second);

        let relative = first.strip_prefix(temp.path())?;
        let shard = relative
            .components()
            .next()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .unwrap_or_default();
        assert_eq!(shard.len(), 2);
        assert_ne!(
            cache.slot_for("mem://bucket/other"),
            first,
            "distinct identifiers must map to distinct slots"
        );
        Ok(())
    }

    #[test]
    fn lookup_reports_only_existing_slots() -> TestResult<()> {
        let temp = temp_dir()?;
        let cache = FileCache::new(temp.path());
        assert!(cache.lookup("mem://bucket/key").is_none());

        let slot = cache.slot_for("mem://bucket/key");
        fs::create_dir_all(slot.parent().expect("shard parent"))?;
        fs::write(&slot, b"payload")?;
        assert_eq!(cache.lookup("mem://bucket/key"), Some(slot));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn materialize_links_into_place() -> TestResult<()> {
        let temp = temp_dir()?;
        let slot = temp.path().join("ab").join("cdef");
        fs::create_dir_all(slot.parent().expect("shard parent"))?;
        fs::write(&slot, b"payload")?;

        let destination = temp.path().join("work").join("in.txt");
        FileCache::materialize(&slot, &destination)?;
        assert_eq!(fs::read(&destination)?, b"payload");
        assert_eq!(
            fs::metadata(&slot)?.ino(),
            fs::metadata(&destination)?.ino()
        );
        Ok(())
    }

    #[test]
    fn populate_fills_an_empty_slot_and_respects_existing_ones() -> TestResult<()> {
        let temp = temp_dir()?;
        let cache = FileCache::new(temp.path().join("cache"));
        cache.ensure_root()?;
        let local = temp.path().join("fetched.txt");
        fs::write(&local, b"fetched")?;

        let slot = cache.slot_for("mem://bucket/key");
        FileCache::populate(&slot, &local);
        assert_eq!(fs::read(&slot)?, b"fetched");

        let other = temp.path().join("other.txt");
        fs::write(&other, b"other")?;
        FileCache::populate(&slot, &other);
        assert_eq!(fs::read(&slot)?, b"fetched", "existing slots are kept");
        Ok(())
    }

    #[test]
    fn populate_swallows_link_failures() -> TestResult<()> {
        let temp = temp_dir()?;
        let cache = FileCache::new(temp.path().join("cache"));
        let slot = cache.slot_for("mem://bucket/key");
        FileCache::populate(&slot, &temp.path().join("missing.txt"));
        assert!(!slot.exists());
        Ok(())
    }
}
