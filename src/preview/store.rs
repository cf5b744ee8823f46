//! File-backed artifact store.
//!
//! One file per fingerprint, directly under the cache directory, named after
//! the fingerprint. Writes go to a dot-prefixed temporary file first and are
//! renamed into place, so a fingerprint-named file is always complete.
//!
//! The store keeps no state besides its root directory; all bookkeeping
//! lives in [`PreviewCache`](super::PreviewCache), which is the only caller.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use tokio::fs;

use super::fingerprint::Fingerprint;
use crate::error::StorageError;

/// An artifact found on disk while scanning the cache directory.
#[derive(Debug, Clone)]
pub(crate) struct StoredArtifact {
    pub fingerprint: Fingerprint,
    pub modified: SystemTime,
}

/// Result of scanning the cache directory.
#[derive(Debug, Default)]
pub(crate) struct ScanResult {
    /// Files whose names are fingerprints
    pub artifacts: Vec<StoredArtifact>,

    /// Leftover temporary files from interrupted writes
    pub strays: Vec<PathBuf>,

    /// Files the store did not create; never deleted
    pub foreign: Vec<PathBuf>,
}

/// Durable store mapping fingerprints to artifact files.
#[derive(Debug, Clone)]
pub(crate) struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open the store at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Scan {
                path: root.display().to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { root })
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact file for `fingerprint`.
    pub fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(fingerprint.as_str())
    }

    fn temp_path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!(".{}.tmp", fingerprint))
    }

    /// Persist `data` as the artifact of `fingerprint`, replacing any
    /// previous file.
    pub async fn write(&self, fingerprint: &Fingerprint, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(fingerprint);
        let temp = self.temp_path_for(fingerprint);

        let result = match fs::write(&temp, data).await {
            Ok(()) => fs::rename(&temp, &path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            // Best effort; an orphaned temp file is removed on the next open
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::Create {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }

        Ok(())
    }

    /// Read the artifact bytes of `fingerprint`.
    pub async fn read(&self, fingerprint: &Fingerprint) -> Result<Bytes, StorageError> {
        let path = self.path_for(fingerprint);

        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::Missing {
                path: path.display().to_string(),
            }),
            Err(e) => Err(StorageError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Delete the artifact of `fingerprint`. Deleting a missing file is not
    /// an error.
    pub async fn remove(&self, fingerprint: &Fingerprint) -> Result<(), StorageError> {
        Self::remove_path(&self.path_for(fingerprint)).await
    }

    /// Delete an arbitrary file inside the cache directory.
    pub async fn remove_path(path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Remove {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Set the modification time of the artifact of `fingerprint` to now.
    ///
    /// External reclamation tools can then order artifacts the same way the
    /// in-memory index does.
    pub async fn touch(&self, fingerprint: &Fingerprint) -> Result<(), StorageError> {
        let path = self.path_for(fingerprint);

        let touch_error = |e: std::io::Error| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::Missing {
                    path: path.display().to_string(),
                }
            } else {
                StorageError::Touch {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        };

        let file = fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .await
            .map_err(&touch_error)?;

        let file = file.into_std().await;
        let now = SystemTime::now();

        tokio::task::spawn_blocking(move || file.set_modified(now))
            .await
            .map_err(|e| StorageError::Touch {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
            .map_err(&touch_error)
    }

    /// List the cache directory.
    pub async fn scan(&self) -> Result<ScanResult, StorageError> {
        let scan_error = |e: std::io::Error| StorageError::Scan {
            path: self.root.display().to_string(),
            message: e.to_string(),
        };

        let mut result = ScanResult::default();
        let mut entries = fs::read_dir(&self.root).await.map_err(scan_error)?;

        while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Removed concurrently by someone else
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(scan_error(e)),
            };
            if !metadata.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let name = file_name.to_str().unwrap_or_default();

            if let Some(fingerprint) = Fingerprint::from_file_name(name) {
                result.artifacts.push(StoredArtifact {
                    fingerprint,
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                });
            } else if is_temp_name(name) {
                result.strays.push(entry.path());
            } else {
                result.foreign.push(entry.path());
            }
        }

        Ok(result)
    }
}

/// Whether `name` has the shape of a temporary file written by
/// [`ArtifactStore::write`].
fn is_temp_name(name: &str) -> bool {
    name.strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(".tmp"))
        .and_then(Fingerprint::from_file_name)
        .is_some()
}
