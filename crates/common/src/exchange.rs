//! Assignment exchange
//!
//! The exchange is the shared location through which released assignments
//! reach students and submissions reach instructors. A course gets its own
//! subtree:
//!
//! ```text
//! <root>/<course>/outbound/<assignment>/...
//! <root>/<course>/inbound/<student>+<assignment>+<timestamp>/...
//! ```
//!
//! Copies are staged in a hidden directory next to their destination and
//! renamed into place, so a reader never observes a half-copied assignment
//! and an abandoned copy is cleaned up.

use crate::types::{AssignmentKey, NotebookItem, SubmissionReceipt};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, info, warn};

/// File written into every submission directory
pub const TIMESTAMP_FILE: &str = "timestamp.txt";

/// Backend performing the actual release, fetch and submit work
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Publish the assignment content for the course
    async fn release(&self, key: &AssignmentKey, items: &[NotebookItem]) -> Result<()>;

    /// Copy the released assignment to `target`
    async fn fetch(&self, key: &AssignmentKey, items: &[NotebookItem], target: &Path) -> Result<()>;

    /// Package the fetched copy at `local_path` and store it as a submission
    async fn submit(&self, key: &AssignmentKey, local_path: &Path) -> Result<SubmissionReceipt>;
}

/// Exchange backed by a directory tree
#[derive(Debug, Clone)]
pub struct FilesystemExchange {
    root: PathBuf,
    source_root: PathBuf,
    student_id: String,
}

impl FilesystemExchange {
    /// Create an exchange rooted at `root`, releasing from `source_root`
    pub async fn new(
        root: impl AsRef<Path>,
        source_root: impl AsRef<Path>,
        student_id: impl Into<String>,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        info!("Initialized exchange at {:?}", root);

        Ok(Self {
            root,
            source_root: source_root.as_ref().to_path_buf(),
            student_id: student_id.into(),
        })
    }

    /// Get the root path of the exchange
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an instructor releases `assignment` from
    pub fn source_dir(&self, assignment: &str) -> PathBuf {
        self.source_root.join(assignment)
    }

    /// Released copy of an assignment
    pub fn outbound_dir(&self, key: &AssignmentKey) -> PathBuf {
        self.root.join(&key.course).join("outbound").join(&key.assignment)
    }

    /// Directory collecting a course's submissions
    pub fn inbound_dir(&self, course: &str) -> PathBuf {
        self.root.join(course).join("inbound")
    }

    /// Notebooks found in the release source of `assignment`
    pub async fn discover_items(&self, assignment: &str) -> Result<Vec<NotebookItem>> {
        discover_items(&self.source_dir(assignment)).await
    }
}

#[async_trait]
impl Exchange for FilesystemExchange {
    async fn release(&self, key: &AssignmentKey, items: &[NotebookItem]) -> Result<()> {
        key.validate()?;
        let source = self.source_dir(&key.assignment);
        if !source.is_dir() {
            return Err(Error::Exchange(format!(
                "release source does not exist: {}",
                source.display()
            )));
        }
        for item in items {
            item.validate()?;
            if !source.join(&item.path).is_file() {
                return Err(Error::Exchange(format!(
                    "notebook {} is missing from {}",
                    item.path.display(),
                    source.display()
                )));
            }
        }

        let dest = self.outbound_dir(key);
        replace_tree(&source, &dest).await?;

        info!("Released {} to {:?}", key, dest);
        Ok(())
    }

    async fn fetch(&self, key: &AssignmentKey, items: &[NotebookItem], target: &Path) -> Result<()> {
        key.validate()?;
        let source = self.outbound_dir(key);
        if !source.is_dir() {
            return Err(Error::Exchange(format!(
                "assignment {} is not present in the exchange",
                key
            )));
        }

        replace_tree(&source, target).await?;

        debug!("Fetched {} ({} notebooks) to {:?}", key, items.len(), target);
        Ok(())
    }

    async fn submit(&self, key: &AssignmentKey, local_path: &Path) -> Result<SubmissionReceipt> {
        key.validate()?;
        if !local_path.is_dir() {
            return Err(Error::Exchange(format!(
                "fetched copy is missing: {}",
                local_path.display()
            )));
        }

        let timestamp = Utc::now();
        let stamp = timestamp.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string();
        let submission_id = format!("{}+{}+{}", self.student_id, key.assignment, stamp);

        let dest = self.inbound_dir(&key.course).join(&submission_id);
        if dest.exists() {
            return Err(Error::Exchange(format!(
                "submission {} already exists",
                submission_id
            )));
        }

        let staging = staging_dir(&dest)?;
        copy_tree(local_path, staging.path()).await?;
        fs::write(staging.path().join(TIMESTAMP_FILE), &stamp).await?;
        swap_into_place(staging, &dest)?;

        info!("Submitted {} as {}", key, submission_id);
        Ok(SubmissionReceipt {
            submission_id,
            timestamp,
        })
    }
}

/// Whether `path` is a directory holding at least one entry
pub async fn dir_has_content(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_some())
}

/// List the `.ipynb` files directly under `dir` as notebook items, sorted by name
pub async fn discover_items(dir: &Path) -> Result<Vec<NotebookItem>> {
    let mut items = Vec::new();

    if dir.is_dir() {
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("ipynb") {
                continue;
            }
            if let (Some(stem), Some(file)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.file_name().and_then(|s| s.to_str()),
            ) {
                items.push(NotebookItem::new(stem).with_path(file));
            }
        }
    }

    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

/// Hidden sibling directory of `dest` to build a copy in.
///
/// The guard removes the directory when dropped, so a copy abandoned halfway
/// (an error, or the caller dropping the future on timeout) leaves nothing
/// behind.
fn staging_dir(dest: &Path) -> Result<TempDir> {
    let parent = dest
        .parent()
        .ok_or_else(|| Error::Exchange(format!("no parent directory for {}", dest.display())))?;
    std::fs::create_dir_all(parent)?;

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}.staging-", name))
        .tempdir_in(parent)?;
    Ok(staging)
}

/// Copy `src` to a staging directory, then swap it in place of `dest`
async fn replace_tree(src: &Path, dest: &Path) -> Result<()> {
    let staging = staging_dir(dest)?;
    copy_tree(src, staging.path()).await?;
    swap_into_place(staging, dest)
}

/// Rename `staging` to `dest`. An existing `dest` is moved aside first and
/// restored if the rename fails.
///
/// Synchronous: with no await point between the two renames, a dropped
/// future can never observe `dest` missing.
fn swap_into_place(staging: TempDir, dest: &Path) -> Result<()> {
    let previous = if dest.exists() {
        let aside = staging_dir(dest)?;
        let old = aside.path().join("previous");
        std::fs::rename(dest, &old)?;
        Some((aside, old))
    } else {
        None
    };

    if let Err(e) = std::fs::rename(staging.path(), dest) {
        if let Some((aside, old)) = previous {
            if std::fs::rename(&old, dest).is_err() {
                // Could not put it back; leave the old copy on disk
                let kept = aside.keep();
                warn!("Previous copy of {:?} left at {:?}", dest, kept);
            }
        }
        return Err(e.into());
    }

    // Renamed away; nothing left for the guard to remove
    let _ = staging.keep();
    // Dropping the guard removes the replaced copy
    drop(previous);
    Ok(())
}

/// Recursively copy the directory `src` into the existing directory `dest`.
///
/// Directories are created one level at a time and never recursively, so a
/// step still in flight after `dest` was removed fails instead of
/// recreating it.
async fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| Error::Exchange(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Exchange(e.to_string()))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir(&target).await?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).await?;
        }
    }

    Ok(())
}
