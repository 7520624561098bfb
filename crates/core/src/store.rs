//! Filesystem access behind a trait so sessions can be driven by an
//! in-memory store in tests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::files::FileLocation;

/// Backend the editor session reads economy files from and writes them
/// back to.
pub trait FileStore: Send + Sync {
    /// Read a file relative to the given location root.
    fn read_file(
        &self,
        location: FileLocation,
        path: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// List file names (not full paths) directly under a directory relative
    /// to the given location root.
    fn read_dir(
        &self,
        location: FileLocation,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Write a file relative to the given location root, optionally keeping
    /// a timestamped backup of the previous content.
    fn write_file(
        &self,
        location: FileLocation,
        path: &str,
        content: &str,
        with_backup: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// [`FileStore`] backed by the local filesystem, rooted at a mission
/// directory and a server profile directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    mission_root: PathBuf,
    profile_root: PathBuf,
}

impl DiskStore {
    pub fn new(mission_root: impl Into<PathBuf>, profile_root: impl Into<PathBuf>) -> Self {
        Self {
            mission_root: mission_root.into(),
            profile_root: profile_root.into(),
        }
    }

    fn resolve(&self, location: FileLocation, path: &str) -> PathBuf {
        let root = match location {
            FileLocation::Mission => &self.mission_root,
            FileLocation::Profile => &self.profile_root,
        };
        root.join(path)
    }
}

impl FileStore for DiskStore {
    async fn read_file(&self, location: FileLocation, path: &str) -> Result<String> {
        let full = self.resolve(location, path);
        tokio::fs::read_to_string(&full)
            .await
            .with_context(|| format!("failed to read {}", full.display()))
    }

    async fn read_dir(&self, location: FileLocation, path: &str) -> Result<Vec<String>> {
        let full = self.resolve(location, path);
        let mut reader = tokio::fs::read_dir(&full)
            .await
            .with_context(|| format!("failed to list {}", full.display()))?;
        let mut names = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn write_file(
        &self,
        location: FileLocation,
        path: &str,
        content: &str,
        with_backup: bool,
    ) -> Result<()> {
        let full = self.resolve(location, path);
        if with_backup && full.exists() {
            let backup = backup_path(&full);
            tokio::fs::copy(&full, &backup)
                .await
                .with_context(|| format!("failed to back up {}", full.display()))?;
        }
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("failed to write {}", full.display()))
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.{stamp}.bak"))
}
