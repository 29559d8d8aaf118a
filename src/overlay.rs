//! Overlaying extracted archive contents onto the install target.

use crate::types::MergeMode;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OverlayReport {
    pub installed: usize,
    /// `(item name, error text)` for every item that failed to copy.
    pub failed: Vec<(String, String)>,
}

/// The directory whose children get copied: the single top-level directory
/// when it is the only entry of `staging`, otherwise `staging` itself.
pub fn effective_root(staging: &Path) -> Result<PathBuf> {
    let mut entries = fs::read_dir(staging)
        .with_context(|| format!("Could not read {}", staging.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;

    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        if let Some(only) = entries.pop() {
            return Ok(only.path());
        }
    }
    Ok(staging.to_path_buf())
}

/// Copy every direct child of `root` into `target`.
///
/// A failing item is reported through `log` and recorded in the returned
/// report; the remaining items are still processed.
pub fn overlay<F>(root: &Path, target: &Path, mode: MergeMode, mut log: F) -> Result<OverlayReport>
where
    F: FnMut(String),
{
    let mut children = fs::read_dir(root)
        .with_context(|| format!("Could not read {}", root.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    children.sort_by_key(|entry| entry.file_name());

    let mut report = OverlayReport::default();
    for child in children {
        let name = child.file_name().to_string_lossy().to_string();
        let source = child.path();
        let dest = target.join(child.file_name());

        match install_entry(&source, &dest, mode) {
            Ok(Some(EntryKind::File)) => {
                report.installed += 1;
                log(format!("File: {}", name));
            }
            Ok(Some(EntryKind::Folder)) => {
                report.installed += 1;
                log(format!("Folder: {}", name));
            }
            Ok(None) => {
                tracing::debug!("Skipping {}: not a regular file or directory", name);
                log(format!("Skipped: {}", name));
            }
            Err(e) => {
                tracing::warn!("Failed to install {}: {:#}", name, e);
                log(format!("Error: {} - {:#}", name, e));
                report.failed.push((name, format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

fn install_entry(source: &Path, dest: &Path, mode: MergeMode) -> Result<Option<EntryKind>> {
    let file_type = fs::symlink_metadata(source)?.file_type();

    if file_type.is_file() {
        copy_file_preserving(source, dest)?;
        return Ok(Some(EntryKind::File));
    }

    if file_type.is_dir() {
        if mode == MergeMode::Replace {
            remove_existing(dest)?;
        }
        copy_dir_all(source, dest)?;
        return Ok(Some(EntryKind::Folder));
    }

    Ok(None)
}

fn remove_existing(dest: &Path) -> Result<()> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(dest)
            .with_context(|| format!("Could not remove {}", dest.display())),
        Ok(_) => fs::remove_file(dest)
            .with_context(|| format!("Could not remove {}", dest.display())),
        Err(_) => Ok(()),
    }
}

/// Copy a file over `dest`, carrying the modification and access times along.
pub fn copy_file_preserving(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest).with_context(|| {
        format!("Could not copy {} to {}", source.display(), dest.display())
    })?;

    // Timestamps are best effort; some filesystems refuse them
    if let Err(e) = copy_times(source, dest) {
        tracing::debug!("Could not preserve timestamps on {}: {}", dest.display(), e);
    }
    Ok(())
}

fn copy_times(source: &Path, dest: &Path) -> std::io::Result<()> {
    let meta = fs::metadata(source)?;
    let times = fs::FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    // futimens only needs ownership on unix, so read-only copies work too
    #[cfg(unix)]
    let file = fs::File::open(dest)?;
    #[cfg(not(unix))]
    let file = fs::File::options().write(true).open(dest)?;
    file.set_times(times)
}

/// Recursively copy `source` into `dest`, creating directories as needed and
/// overwriting files that already exist.
pub fn copy_dir_all(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| anyhow!("{} escaped {}", entry.path().display(), source.display()))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Could not create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            copy_file_preserving(entry.path(), &target)?;
        } else {
            tracing::debug!("Skipping special file {}", entry.path().display());
        }
    }
    Ok(())
}
