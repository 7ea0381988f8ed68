use std::ops::Range;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::{DirId, FsError, Md5, PathKey, Result};
use tokio_util::sync::CancellationToken;

use super::{join_remote, split_remote, Fs};
use crate::metadata::RemoteInfo;

/// A file on the remote
///
/// Size and modification time are authoritative once they came from the
/// server (listing, metadata fetch, or a parsed upload). Until then they
/// hold what the caller declared.
#[derive(Debug, Clone)]
pub struct Object {
    fs: Fs,
    path: PathKey,
    /// Basename as the server spells it
    id: Option<String>,
    parent: Option<DirId>,
    modified: DateTime<Utc>,
    size: u64,
    md5: Md5,
    pub(super) authoritative: bool,
}

impl Object {
    pub(crate) fn from_parts(
        fs: Fs,
        path: PathKey,
        id: Option<String>,
        parent: Option<DirId>,
        modified: DateTime<Utc>,
        size: u64,
        md5: Md5,
    ) -> Self {
        Self {
            fs,
            path,
            id,
            parent,
            modified,
            size,
            md5,
            authoritative: true,
        }
    }

    fn declared(fs: Fs, path: PathKey, modified: DateTime<Utc>, size: u64) -> Self {
        Self {
            fs,
            path,
            id: None,
            parent: None,
            modified,
            size,
            md5: Md5::Unfetched,
            authoritative: false,
        }
    }

    pub fn fs(&self) -> &Fs {
        &self.fs
    }

    /// Path relative to the filesystem root
    pub fn path(&self) -> &PathKey {
        &self.path
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn parent(&self) -> Option<&DirId> {
        self.parent.as_ref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn md5(&self) -> &Md5 {
        &self.md5
    }

    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    /// Absolute remote path
    pub fn remote_path(&self) -> String {
        match (&self.parent, &self.id) {
            (Some(parent), Some(id)) => join_remote(parent.as_str(), id),
            _ => self.fs.full_path(&self.path),
        }
    }

    /// MD5 of the content, fetched from the server when not known yet.
    /// `None` means the server has no hash for this file.
    pub async fn hash(&mut self, cancel: &CancellationToken) -> Result<Option<String>> {
        if self.md5.needs_fetch() {
            let info = self.fetch(cancel).await?;
            self.apply(info);
        }
        Ok(self.md5.value().map(str::to_string))
    }

    /// Download the whole content
    pub async fn open(&self, cancel: &CancellationToken) -> Result<Bytes> {
        self.download(None, cancel).await
    }

    /// Download the bytes in `range`. The range is clamped to the current
    /// size; a range starting at or past the end reads nothing.
    pub async fn open_range(&self, range: Range<u64>, cancel: &CancellationToken) -> Result<Bytes> {
        self.download(Some(range), cancel).await
    }

    async fn download(&self, range: Option<Range<u64>>, cancel: &CancellationToken) -> Result<Bytes> {
        let info = self.fetch(cancel).await?;
        let range = match range {
            Some(range) => {
                let end = range.end.min(info.size);
                if range.start >= end {
                    return Ok(Bytes::new());
                }
                // Whole file: a plain GET
                (range.start > 0 || end < info.size).then_some(range.start..end)
            }
            None => None,
        };
        let raw_url = info
            .raw_url
            .ok_or_else(|| FsError::fatal(&info.path, None, "server returned no download URL"))?;

        let remote = self.fs.inner().remote();
        let (url, requested) = (raw_url.as_str(), range.clone());
        let data = self
            .fs
            .inner()
            .paced(cancel, move || remote.download(url, requested.clone()))
            .await
            .map_err(|e| e.into_fs_error(&info.path))?;
        tracing::debug!(path = %self.path, bytes = data.len(), ?range, "downloaded object");
        Ok(data)
    }

    pub async fn remove(&self, cancel: &CancellationToken) -> Result<()> {
        let full = self.remote_path();
        let (dir, leaf) = split_remote(&full);
        let names = [leaf.to_string()];
        let names_ref = &names;
        let remote = self.fs.inner().remote();
        self.fs
            .inner()
            .paced(cancel, move || remote.remove(dir, names_ref))
            .await
            .map_err(|e| e.into_fs_error(&full))?;
        tracing::debug!(path = %self.path, "removed object");
        Ok(())
    }

    /// Replace the content
    pub async fn update(
        &mut self,
        content: Bytes,
        modified: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let updated = self.fs.put(&self.path, content, modified, cancel).await?;
        *self = updated;
        Ok(())
    }

    /// Record a modification time locally; the server keeps its own
    pub fn set_mod_time(&mut self, modified: DateTime<Utc>) {
        self.modified = modified;
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<RemoteInfo> {
        self.fs
            .inner()
            .resolver()
            .resolve(&self.remote_path(), cancel)
            .await
    }

    fn apply(&mut self, info: RemoteInfo) {
        self.id = Some(info.name);
        self.size = info.size;
        self.modified = info.modified;
        self.md5 = info.md5;
        self.authoritative = true;
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path.relative())
    }
}

impl Fs {
    /// Look up the file at `path`
    pub async fn new_object(&self, path: &PathKey, cancel: &CancellationToken) -> Result<Object> {
        let (leaf, parent) = match self.find_path(path, false, cancel).await {
            Ok(found) => found,
            Err(FsError::DirNotFound(_)) => return Err(FsError::NotFound(path.to_string())),
            Err(e) => return Err(e),
        };
        let full = join_remote(parent.as_str(), &self.inner().encoder().encode(&leaf));
        let info = self.inner().resolver().resolve(&full, cancel).await?;
        if info.is_dir {
            return Err(FsError::NotFound(path.to_string()));
        }
        Ok(Object::from_parts(
            self.clone(),
            path.clone(),
            Some(info.name),
            Some(parent),
            info.modified,
            info.size,
            info.md5,
        ))
    }

    /// Upload `content` to `path`, creating missing parent directories
    pub async fn put(
        &self,
        path: &PathKey,
        content: Bytes,
        modified: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<Object> {
        let (leaf, parent) = self.find_path(path, true, cancel).await?;
        let encoded = self.inner().encoder().encode(&leaf);
        let full = join_remote(parent.as_str(), &encoded);
        let size = content.len() as u64;

        let remote = self.inner().remote();
        let target = full.as_str();
        let ack = self
            .inner()
            .paced(cancel, move || remote.upload(target, content.clone(), modified))
            .await
            .map_err(|e| e.into_fs_error(&full))?;

        let mut object = Object::declared(self.clone(), path.clone(), modified.unwrap_or_else(Utc::now), size);
        object.parent = Some(parent);
        object.id = Some(encoded);

        if ack.is_some() {
            // The server accepted exactly what was sent
            object.authoritative = true;
        } else {
            let info = self.inner().resolver().resolve(&full, cancel).await?;
            object.apply(info);
            if let Some(modified) = modified {
                object.set_mod_time(modified);
            }
        }
        tracing::debug!(%path, size, authoritative = object.authoritative, "uploaded object");
        Ok(object)
    }
}
