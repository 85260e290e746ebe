use anyhow::{Context, Result};
use clap::ValueEnum;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Move files to the output directory
    #[default]
    Move,
    /// Copy files to the output directory
    Copy,
    /// Create hard links in the output directory
    Link,
}

impl Mode {
    /// Shell-style verb shown for dry runs.
    pub fn verb(&self) -> &'static str {
        match self {
            Mode::Move => "mv",
            Mode::Copy => "cp",
            Mode::Link => "ln",
        }
    }
}

/// Puts `old` at `new`, creating parent directories. Never overwrites.
pub fn commit(mode: Mode, old: &Path, new: &Path) -> Result<()> {
    if new.exists() {
        anyhow::bail!("Destination already exists: {}", new.display());
    }
    let parent = new.parent().context("Failed to get parent")?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;
    match mode {
        Mode::Copy => {
            fs::copy(old, new)?;
        }
        Mode::Move => move_file(old, new)?,
        Mode::Link => {
            fs::hard_link(old, new)?;
        }
    };
    debug!(mode = mode.verb(), old = %old.display(), new = %new.display(), "committed");
    Ok(())
}

fn move_file(old: &Path, new: &Path) -> Result<()> {
    match fs::rename(old, new) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(old = %old.display(), "rename crosses devices, copying instead");
            fs::copy(old, new)?;
            fs::remove_file(old)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Removes empty directories below `root`, deepest first. `root` itself is kept.
/// Directories that cannot be read or removed are logged and left in place.
pub fn prune_empty_dirs(root: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    if !root.is_dir() {
        return removed;
    }

    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), "failed to walk output folder: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        match remove_if_empty(entry.path()) {
            Ok(true) => {
                info!(path = %entry.path().display(), "removed empty folder");
                removed.push(entry.into_path());
            }
            Ok(false) => {}
            Err(e) => warn!(path = %entry.path().display(), "failed to prune folder: {:#}", e),
        }
    }

    removed
}

fn remove_if_empty(dir: &Path) -> Result<bool> {
    let empty = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .next()
        .is_none();
    if empty {
        fs::remove_dir(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
    }
    Ok(empty)
}
