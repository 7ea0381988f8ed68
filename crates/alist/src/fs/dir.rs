use common::{DirId, DirectoryEntry, FsError, Md5, PathKey, Result};
use tokio_util::sync::CancellationToken;

use super::{join_remote, split_remote, Fs, Object};
use crate::api::Item;

/// One child returned by [`Fs::list`]
#[derive(Debug, Clone)]
pub enum ListEntry {
    Dir(DirectoryEntry),
    Object(Object),
}

impl ListEntry {
    pub fn path(&self) -> &PathKey {
        match self {
            ListEntry::Dir(dir) => &dir.path,
            ListEntry::Object(object) => object.path(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, ListEntry::Dir(_))
    }
}

impl Fs {
    /// Children of `dir`. Child directories are recorded in the cache
    /// unless it was flushed while the listing was in flight.
    pub async fn list(&self, dir: &PathKey, cancel: &CancellationToken) -> Result<Vec<ListEntry>> {
        let dir_id = self.find_dir(dir, false, cancel).await?;
        let epoch = self.dir_cache().epoch();
        let items = self.inner().list_items(dir_id.as_str(), cancel).await?;
        tracing::debug!(%dir, count = items.len(), "listed directory");

        Ok(items
            .into_iter()
            .map(|item| self.list_entry(dir, &dir_id, epoch, item))
            .collect())
    }

    fn list_entry(&self, dir: &PathKey, dir_id: &DirId, epoch: u64, item: Item) -> ListEntry {
        let name = self.inner().encoder().decode(&item.name);
        let path = dir.join(&name);
        if item.is_dir {
            let id = DirId::new(join_remote(dir_id.as_str(), &item.name));
            self.dir_cache().put_if_current(epoch, path.clone(), id.clone());
            ListEntry::Dir(DirectoryEntry {
                name,
                path,
                id,
                parent: dir_id.clone(),
                modified: item.modified,
            })
        } else {
            let size = item.size();
            let md5 = Md5::from_listing(item.hash_info.clone());
            ListEntry::Object(Object::from_parts(
                self.clone(),
                path,
                Some(item.name),
                Some(dir_id.clone()),
                item.modified,
                size,
                md5,
            ))
        }
    }

    /// Create `dir` along with any missing parents. An existing directory
    /// is success.
    pub async fn mkdir(&self, dir: &PathKey, cancel: &CancellationToken) -> Result<()> {
        if dir.is_root() && self.root() == "/" {
            return Ok(());
        }
        let full = self.full_path(dir);
        let epoch = self.dir_cache().epoch();
        self.inner().make_dir(&full, cancel).await?;
        self.dir_cache().put_if_current(epoch, dir.clone(), DirId::new(full));
        tracing::debug!(%dir, "created directory");
        Ok(())
    }

    /// Remove the empty directory `dir`
    pub async fn rmdir(&self, dir: &PathKey, cancel: &CancellationToken) -> Result<()> {
        self.purge_check(dir, true, cancel).await
    }

    /// Remove `dir` and everything below it
    pub async fn purge(&self, dir: &PathKey, cancel: &CancellationToken) -> Result<()> {
        self.purge_check(dir, false, cancel).await
    }

    async fn purge_check(
        &self,
        dir: &PathKey,
        require_empty: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let full = self.full_path(dir);
        if full == "/" {
            return Err(FsError::fatal(full, None, "refusing to remove the root directory"));
        }
        let dir_id = self.find_dir(dir, false, cancel).await?;

        if require_empty {
            let children = self.inner().list_items(dir_id.as_str(), cancel).await?;
            if !children.is_empty() {
                return Err(FsError::NotEmpty(dir.to_string()));
            }
        }

        let (parent, leaf) = split_remote(dir_id.as_str());
        let names = [leaf.to_string()];
        let remote = self.inner().remote();
        let names_ref = &names;
        let result = self
            .inner()
            .paced(cancel, move || remote.remove(parent, names_ref))
            .await;
        self.dir_cache().flush(dir);
        result.map_err(|e| e.into_fs_error(dir_id.as_str()))?;
        tracing::debug!(%dir, require_empty, "removed directory");
        Ok(())
    }
}
