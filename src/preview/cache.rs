//! Preview cache: recency index plus durable artifact store.
//!
//! # Consistency
//!
//! The set of fingerprints in the in-memory index is always exactly the set
//! of artifact files in the cache directory. Both `lookup` and `insert` hold
//! the index lock for their whole duration, file I/O included, and every
//! failure path either happens before the index is touched or brings the
//! index back in line with what is on disk.
//!
//! # Eviction
//!
//! The index is an [`LruCache`] whose capacity equals the cache capacity.
//! Eviction is done by hand before inserting a new fingerprint so that the
//! artifact file is deleted before its entry leaves the index; the LRU never
//! evicts on its own.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::artifact::Artifact;
use super::fingerprint::Fingerprint;
use super::store::ArtifactStore;
use crate::error::StorageError;

/// Bounded, file-backed LRU cache of preview artifacts.
///
/// # Thread Safety
///
/// The cache is safe to share across tasks via `Arc`. Operations are
/// serialized by a single async mutex.
pub struct PreviewCache {
    /// Recency order of cached fingerprints, most recently used first
    index: Mutex<LruCache<Fingerprint, ()>>,

    /// Artifact files
    store: ArtifactStore,

    /// Maximum number of cached previews
    capacity: NonZeroUsize,
}

impl PreviewCache {
    /// Open a cache rooted at `dir` holding at most `capacity` previews.
    ///
    /// The directory is created if needed. Artifacts left by a previous run
    /// are adopted, most recently modified first; files beyond `capacity`
    /// and leftover temporary files are deleted. Other files are left alone.
    pub async fn open(
        dir: impl Into<PathBuf>,
        capacity: NonZeroUsize,
    ) -> Result<Self, StorageError> {
        let store = ArtifactStore::open(dir).await?;
        let scan = store.scan().await?;

        for stray in &scan.strays {
            if let Err(e) = ArtifactStore::remove_path(stray).await {
                warn!(path = %stray.display(), "Could not remove stray file: {}", e);
            }
        }

        for path in &scan.foreign {
            warn!(path = %path.display(), "Ignoring file that is not a cached preview");
        }

        let mut artifacts = scan.artifacts;
        artifacts.sort_by(|a, b| b.modified.cmp(&a.modified));

        let excess = artifacts.split_off(artifacts.len().min(capacity.get()));
        for artifact in &excess {
            store.remove(&artifact.fingerprint).await?;
        }

        let mut index = LruCache::new(capacity);
        // Oldest first, so the newest artifact ends up most recently used
        for artifact in artifacts.into_iter().rev() {
            index.put(artifact.fingerprint, ());
        }

        info!(
            dir = %store.root().display(),
            adopted = index.len(),
            discarded = excess.len(),
            capacity = capacity.get(),
            "Opened preview cache"
        );

        Ok(Self {
            index: Mutex::new(index),
            store,
            capacity,
        })
    }

    /// Look up the artifact of `fingerprint`.
    ///
    /// On a hit the entry becomes the most recently used and its file
    /// modification time is refreshed. Returns `Ok(None)` on a miss, without
    /// touching anything.
    ///
    /// An indexed artifact whose file vanished or no longer decodes is
    /// dropped from the cache and reported as a miss.
    pub async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<Artifact>, StorageError> {
        let mut index = self.index.lock().await;

        if !index.contains(fingerprint) {
            return Ok(None);
        }

        let touched = self.store.touch(fingerprint).await;
        let data = match touched {
            Ok(()) => self.store.read(fingerprint).await,
            Err(e) => Err(e),
        };

        let data = match data {
            Ok(data) => data,
            Err(e) if e.is_missing() => {
                warn!(%fingerprint, "Artifact file disappeared, dropping cache entry");
                index.pop(fingerprint);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let artifact = match Artifact::from_jpeg(data) {
            Ok(artifact) => artifact,
            Err(reason) => {
                warn!(%fingerprint, "Artifact is corrupt, dropping cache entry: {}", reason);
                self.store.remove(fingerprint).await?;
                index.pop(fingerprint);
                return Ok(None);
            }
        };

        index.promote(fingerprint);
        debug!(%fingerprint, "Preview cache hit");

        Ok(Some(artifact))
    }

    /// Remember `artifact` under `fingerprint`.
    ///
    /// Returns `true` if the fingerprint was already cached. In that case
    /// only recency and modification time are refreshed; the stored bytes
    /// are kept as they are, since a fingerprint always describes the same
    /// preview.
    ///
    /// Otherwise, if the cache is full, the least recently used preview is
    /// evicted (index entry and file) before the new artifact is written.
    pub async fn insert(
        &self,
        fingerprint: Fingerprint,
        artifact: &Artifact,
    ) -> Result<bool, StorageError> {
        let mut index = self.index.lock().await;

        if index.contains(&fingerprint) {
            match self.store.touch(&fingerprint).await {
                Ok(()) => {}
                Err(e) if e.is_missing() => {
                    warn!(%fingerprint, "Artifact file disappeared, writing it again");
                    if let Err(e) = self.store.write(&fingerprint, &artifact.data).await {
                        index.pop(&fingerprint);
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }

            index.promote(&fingerprint);
            debug!(%fingerprint, "Refreshed cached preview");
            return Ok(true);
        }

        if index.len() >= self.capacity.get() {
            let lru = index.peek_lru().map(|(key, _)| key.clone());
            if let Some(lru) = lru {
                self.store.remove(&lru).await?;
                index.pop(&lru);
                debug!(evicted = %lru, "Evicted least recently used preview");
            }
        }

        self.store.write(&fingerprint, &artifact.data).await?;
        debug!(%fingerprint, bytes = artifact.len(), "Cached new preview");
        index.put(fingerprint, ());

        Ok(false)
    }

    /// Check whether `fingerprint` is cached, without changing its recency.
    pub async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.index.lock().await.contains(fingerprint)
    }

    /// Number of cached previews.
    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.is_empty()
    }

    /// Maximum number of cached previews.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        self.store.root()
    }
}

// =============================================================================
// Tests
// =============================================================================
