//! Path resolution cache
//!
//! Maps [`PathKey`]s (relative to a filesystem root) to backend directory
//! identifiers. Entries appear only for paths that were actually resolved
//! or created; a miss lists the parent once and records every directory
//! child seen, so sibling lookups that follow are free.
//!
//! Listings of one parent are serialized so concurrent lookups under the
//! same unresolved parent share a single listing, while walks through
//! unrelated parents proceed independently. Every flush bumps an epoch;
//! a walk or listing that raced a flush finishes with the identifiers it
//! observed but does not write them back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

use crate::entry::DirId;
use crate::error::{FsError, Result};
use crate::path::PathKey;

/// Remote primitives the cache needs to resolve and create directories
#[async_trait]
pub trait DirCacher: Send + Sync {
    /// Directory children of `parent` as (decoded name, identifier) pairs
    async fn list_dirs(
        &self,
        parent: &DirId,
        cancel: &CancellationToken,
    ) -> Result<Vec<(String, DirId)>>;

    /// Create `leaf` inside `parent` and return its identifier
    async fn create_dir(
        &self,
        parent: &DirId,
        leaf: &str,
        cancel: &CancellationToken,
    ) -> Result<DirId>;
}

type WalkLock = Arc<tokio::sync::Mutex<()>>;

pub struct DirCache {
    root_id: DirId,
    entries: RwLock<HashMap<PathKey, DirId>>,
    /// One lock per parent currently being listed
    walks: Mutex<HashMap<PathKey, WalkLock>>,
    epoch: AtomicU64,
}

/// Held while one parent is listed; drops its map slot when the last
/// waiter is done.
struct WalkGuard<'a> {
    cache: &'a DirCache,
    parent: PathKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WalkGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut walks = self.cache.walks.lock();
        if walks
            .get(&self.parent)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            walks.remove(&self.parent);
        }
    }
}

impl DirCache {
    pub fn new(root_id: DirId) -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathKey::root(), root_id.clone());
        Self {
            root_id,
            entries: RwLock::new(entries),
            walks: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn root_id(&self) -> &DirId {
        &self.root_id
    }

    pub fn get(&self, path: &PathKey) -> Option<DirId> {
        self.entries.read().get(path).cloned()
    }

    /// Record `path` unconditionally. Callers holding identifiers read
    /// from the server before a possible flush use [`put_if_current`].
    ///
    /// [`put_if_current`]: DirCache::put_if_current
    pub fn put(&self, path: PathKey, id: DirId) {
        self.entries.write().insert(path, id);
    }

    /// Current flush generation. Snapshot it before a remote call whose
    /// results are recorded afterwards.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Record `path` only if nothing was flushed since `epoch` was taken.
    /// Returns whether the entry was written.
    pub fn put_if_current(&self, epoch: u64, path: PathKey, id: DirId) -> bool {
        let mut entries = self.entries.write();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(%path, "directory cache flushed since listing, not recording");
            return false;
        }
        entries.insert(path, id);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove `path` and everything below it. Flushing the root leaves only
    /// the root entry.
    pub fn flush(&self, path: &PathKey) {
        let mut entries = self.entries.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if path.is_root() {
            entries.clear();
            entries.insert(PathKey::root(), self.root_id.clone());
        } else {
            entries.retain(|key, _| !key.is_within(path));
        }
        tracing::debug!(%path, remaining = entries.len(), "flushed directory cache");
    }

    /// Drop every entry and re-seed the root
    pub fn reset_root(&self) {
        self.flush(&PathKey::root());
    }

    /// Resolve `path` to a directory identifier, listing or creating the
    /// missing segments.
    pub async fn find_dir(
        &self,
        cacher: &dyn DirCacher,
        path: &PathKey,
        create: bool,
        cancel: &CancellationToken,
    ) -> Result<DirId> {
        if let Some(id) = self.get(path) {
            return Ok(id);
        }
        let epoch = self.epoch();

        let mut parent_id = self.root_id.clone();
        let mut parent_path = PathKey::root();
        for key in path.ancestors().into_iter().skip(1) {
            if let Some(id) = self.get(&key) {
                parent_id = id;
                parent_path = key;
                continue;
            }

            let _walk = self.lock_parent(&parent_path).await;
            // Another walk may have listed this parent while we waited
            if let Some(id) = self.get(&key) {
                parent_id = id;
                parent_path = key;
                continue;
            }

            let children = cacher.list_dirs(&parent_id, cancel).await?;
            let found = self.record_listing(epoch, &parent_path, &children, key.leaf());

            let id = match found {
                Some(id) => id,
                None if create => {
                    let id = cacher.create_dir(&parent_id, key.leaf(), cancel).await?;
                    tracing::debug!(path = %key, %id, "created missing directory");
                    self.put_if_current(epoch, key.clone(), id.clone());
                    id
                }
                None => return Err(FsError::DirNotFound(path.to_string())),
            };
            parent_id = id;
            parent_path = key;
        }
        Ok(parent_id)
    }

    /// Look up one directory `name` inside an already-resolved parent
    pub async fn find_leaf(
        &self,
        cacher: &dyn DirCacher,
        parent_path: &PathKey,
        parent_id: &DirId,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<DirId>> {
        let key = parent_path.join(name);
        if let Some(id) = self.get(&key) {
            return Ok(Some(id));
        }

        let _walk = self.lock_parent(parent_path).await;
        if let Some(id) = self.get(&key) {
            return Ok(Some(id));
        }
        let epoch = self.epoch();
        let children = cacher.list_dirs(parent_id, cancel).await?;
        Ok(self.record_listing(epoch, parent_path, &children, key.leaf()))
    }

    /// Resolve the directory holding `path` and split off its leaf name
    pub async fn find_path(
        &self,
        cacher: &dyn DirCacher,
        path: &PathKey,
        create: bool,
        cancel: &CancellationToken,
    ) -> Result<(String, DirId)> {
        if path.is_root() {
            return Err(FsError::NotFound(path.to_string()));
        }
        let (parent, leaf) = path.split();
        let parent_id = self.find_dir(cacher, &parent, create, cancel).await?;
        Ok((leaf.to_string(), parent_id))
    }

    async fn lock_parent(&self, parent: &PathKey) -> WalkGuard<'_> {
        let lock = self.walks.lock().entry(parent.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        WalkGuard {
            cache: self,
            parent: parent.clone(),
            guard: Some(guard),
        }
    }

    /// Insert every listed child and return the one named `wanted`
    fn record_listing(
        &self,
        epoch: u64,
        parent_path: &PathKey,
        children: &[(String, DirId)],
        wanted: &str,
    ) -> Option<DirId> {
        let mut entries = self.entries.write();
        let current = self.epoch.load(Ordering::SeqCst) == epoch;
        let mut found = None;
        for (name, id) in children {
            if current {
                entries.insert(parent_path.join(name), id.clone());
            }
            if name == wanted {
                found = Some(id.clone());
            }
        }
        if !current {
            tracing::debug!(%parent_path, "directory cache flushed during listing, not recording");
        }
        found
    }
}

impl std::fmt::Debug for DirCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirCache")
            .field("root_id", &self.root_id)
            .field("entries", &self.len())
            .field("epoch", &self.epoch.load(Ordering::SeqCst))
            .finish()
    }
}
