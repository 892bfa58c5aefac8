//! Hard-link/copy placement for local (schemeless) targets.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use url::Url;
use walkdir::WalkDir;

use crate::error::{ProvisionError, ProvisionResult};

/// Establish `target` at `destination` without a provider.
///
/// Relative targets resolve against the process working directory. A hard
/// link is attempted first; on failure the target is copied instead,
/// recursively when it is a directory. Both failing is terminal for the file.
pub fn place(target: &str, destination: &Path) -> ProvisionResult<()> {
    let resolved = if Path::new(target).is_absolute() {
        PathBuf::from(target)
    } else {
        std::env::current_dir()
            .map_err(|source| ProvisionError::io("place.current_dir", target, source))?
            .join(target)
    };

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| ProvisionError::io("place.create_parent", parent, source))?;
    }

    match fs::hard_link(&resolved, destination) {
        Ok(()) => Ok(()),
        Err(link_err) => {
            info!(
                error = %link_err,
                source = %resolved.display(),
                destination = %destination.display(),
                "could not hard-link local target, copying instead"
            );
            copy_tree(&resolved, destination)
        }
    }
}

/// Resolve a destination identifier to a local path.
///
/// `file://` URIs map to their filesystem path; anything else is taken as a
/// plain path.
pub(crate) fn resolve_identifier(identifier: &str) -> PathBuf {
    if let Ok(url) = Url::parse(identifier)
        && url.scheme() == "file"
        && let Ok(path) = url.to_file_path()
    {
        return path;
    }
    PathBuf::from(identifier)
}

/// Copy a file or directory tree from `source` to `destination`, creating
/// parents and matching directories along the way.
pub(crate) fn copy_tree(source: &Path, destination: &Path) -> ProvisionResult<()> {
    if source.is_file() {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source_err| {
                ProvisionError::io("copy_tree.create_parent", parent, source_err)
            })?;
        }
        fs::copy(source, destination)
            .map_err(|source_err| ProvisionError::io("copy_tree.copy_file", destination, source_err))?;
        return Ok(());
    }

    fs::create_dir_all(destination)
        .map_err(|source_err| ProvisionError::io("copy_tree.create_dir", destination, source_err))?;

    for entry in WalkDir::new(source) {
        let entry = entry
            .map_err(|source_err| ProvisionError::walkdir("copy_tree.walk", source, source_err))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| ProvisionError::InvalidInput {
                field: "source_path",
                reason: "strip_prefix",
                value: Some(entry.path().to_string_lossy().into_owned()),
            })?;
        let target_path = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target_path).map_err(|source_err| {
                ProvisionError::io("copy_tree.create_dir", &target_path, source_err)
            })?;
        } else {
            if let Some(parent) = target_path.parent() {
                fs::create_dir_all(parent).map_err(|source_err| {
                    ProvisionError::io("copy_tree.create_parent", parent, source_err)
                })?;
            }
            fs::copy(entry.path(), &target_path).map_err(|source_err| {
                ProvisionError::io("copy_tree.copy_entry", &target_path, source_err)
            })?;
        }
    }

    Ok(())
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

    #[cfg(unix)]
    #[test]
    fn place_hard_links_absolute_targets() -> TestResult<()> {
        let temp = temp_dir()?;
        let source = temp.path().join("in.txt");
        fs::write(&source, b"input")?;

        let destination = temp.path().join("work").join("in.txt");
        place(&source.display().to_string(), &destination)?;

        assert_eq!(fs::read(&destination)?, b"input");
        assert_eq!(
            fs::metadata(&source)?.ino(),
            fs::metadata(&destination)?.ino()
        );
        Ok(())
    }

    #[test]
    fn place_copies_directory_trees_when_linking_fails() -> TestResult<()> {
        let temp = temp_dir()?;
        let source = temp.path().join("inputs");
        fs::create_dir_all(source.join("nested"))?;
        fs::write(source.join("a.txt"), b"a")?;
        fs::write(source.join("nested").join("b.txt"), b"b")?;

        let destination = temp.path().join("work").join("inputs");
        place(&source.display().to_string(), &destination)?;

        assert_eq!(fs::read(destination.join("a.txt"))?, b"a");
        assert_eq!(fs::read(destination.join("nested").join("b.txt"))?, b"b");
        Ok(())
    }

    #[test]
    fn place_fails_when_the_target_is_missing() -> TestResult<()> {
        let temp = temp_dir()?;
        let missing = temp.path().join("missing.txt");
        let err = place(
            &missing.display().to_string(),
            &temp.path().join("work").join("missing.txt"),
        )
        .expect_err("a missing target cannot be placed");
        assert!(matches!(
            err,
            ProvisionError::Io { .. } | ProvisionError::Walkdir { .. }
        ));
        Ok(())
    }

    #[test]
    fn identifiers_resolve_through_file_urls_and_plain_paths() {
        assert_eq!(
            resolve_identifier("file:///tmp/out.txt"),
            PathBuf::from("/tmp/out.txt")
        );
        assert_eq!(
            resolve_identifier("/var/results/out.txt"),
            PathBuf::from("/var/results/out.txt")
        );
        assert_eq!(
            resolve_identifier("results/out.txt"),
            PathBuf::from("results/out.txt")
        );
    }

    #[test]
    fn copy_tree_copies_single_files() -> TestResult<()> {
        let temp = temp_dir()?;
        let source = temp.path().join("one.txt");
        fs::write(&source, b"one")?;
        let destination = temp.path().join("deep").join("one.txt");
        copy_tree(&source, &destination)?;
        assert_eq!(fs::read(&destination)?, b"one");
        Ok(())
    }
}
