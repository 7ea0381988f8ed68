//! Server-side move, copy and directory move
//!
//! Alist can rename in place and can move or copy a named child between
//! directories, but it cannot do both at once. Anything it cannot express
//! is reported as [`FsError::Unsupported`] so the caller can fall back to
//! a client-side transfer. Parent subtrees are flushed from the directory
//! cache after every structural call, whether it succeeded or not.

use common::{DirId, Fallback, FsError, PathKey, Result};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use super::{is_conflict, is_unsupported, join_remote, split_remote, Fs, Object};
use crate::api::ApiError;

fn transfer_error(err: ApiError, op: Fallback, src: &str, dst: &str) -> FsError {
    if is_conflict(&err) {
        FsError::Conflict(dst.to_string())
    } else if is_unsupported(&err) {
        tracing::debug!(%op, src, dst, error = %err, "server refused operation");
        FsError::unsupported(op, src, dst)
    } else {
        err.into_fs_error(src)
    }
}

/// Route missing on older servers
fn is_missing_route(err: &ApiError) -> bool {
    matches!(
        err.http_status(),
        Some(StatusCode::NOT_FOUND) | Some(StatusCode::METHOD_NOT_ALLOWED)
    )
}

fn parent_key(path: &PathKey) -> PathKey {
    path.parent().unwrap_or_else(PathKey::root)
}

impl Fs {
    /// Move `src` to `dst` on this filesystem
    pub async fn move_object(
        &self,
        src: &Object,
        dst: &PathKey,
        cancel: &CancellationToken,
    ) -> Result<Object> {
        self.transfer_object(src, dst, Fallback::Move, cancel).await
    }

    /// Copy `src` to `dst` on this filesystem
    pub async fn copy_object(
        &self,
        src: &Object,
        dst: &PathKey,
        cancel: &CancellationToken,
    ) -> Result<Object> {
        self.transfer_object(src, dst, Fallback::Copy, cancel).await
    }

    async fn transfer_object(
        &self,
        src: &Object,
        dst: &PathKey,
        op: Fallback,
        cancel: &CancellationToken,
    ) -> Result<Object> {
        let src_full = src.remote_path();
        let dst_full = self.full_path(dst);
        if !self.same_instance(src.fs()) || dst.is_root() {
            return Err(FsError::unsupported(op, src_full, dst_full));
        }

        let (src_dir, src_leaf) = split_remote(&src_full);
        let (dst_dir, dst_leaf) = split_remote(&dst_full);

        if src_dir == dst_dir {
            if op == Fallback::Copy {
                return Err(FsError::unsupported(op, src_full.as_str(), dst_full.as_str()));
            }
            if src_leaf == dst_leaf {
                tracing::debug!(path = %dst, "source and destination are the same");
                return Ok(src.relocated(self.clone(), dst.clone(), src.parent().cloned()));
            }

            let remote = self.inner().remote();
            let (path, name) = (src_full.as_str(), dst_leaf);
            let result = self
                .inner()
                .paced(cancel, move || remote.rename(path, name))
                .await;
            self.flush_after_transfer(src, dst);
            result.map_err(|e| transfer_error(e, op, &src_full, &dst_full))?;
            tracing::debug!(src = %src_full, dst = %dst_full, "renamed object");
            return self
                .read_back(dst, &dst_full, src.parent().cloned(), cancel)
                .await;
        }

        if src_leaf != dst_leaf {
            return Err(FsError::unsupported(op, src_full.as_str(), dst_full.as_str()));
        }

        let dst_dir_id = self.find_dir(&parent_key(dst), true, cancel).await?;
        let names = [src_leaf.to_string()];
        let names_ref = &names;
        let remote = self.inner().remote();
        let to = dst_dir_id.as_str();
        let result = match op {
            Fallback::Copy => {
                self.inner()
                    .paced(cancel, move || remote.copy_items(src_dir, to, names_ref))
                    .await
            }
            _ => {
                self.inner()
                    .paced(cancel, move || remote.move_items(src_dir, to, names_ref))
                    .await
            }
        };
        self.flush_after_transfer(src, dst);
        result.map_err(|e| transfer_error(e, op, &src_full, &dst_full))?;
        tracing::debug!(%op, src = %src_full, dst = %join_remote(to, dst_leaf), "transferred object");
        self.read_back(dst, &dst_full, Some(dst_dir_id), cancel).await
    }

    /// The object a server-side transfer left at `full`, as the server
    /// now reports it
    async fn read_back(
        &self,
        path: &PathKey,
        full: &str,
        parent: Option<DirId>,
        cancel: &CancellationToken,
    ) -> Result<Object> {
        let info = self.inner().resolver().resolve(full, cancel).await?;
        Ok(Object::from_parts(
            self.clone(),
            path.clone(),
            Some(info.name),
            parent,
            info.modified,
            info.size,
            info.md5,
        ))
    }

    fn flush_after_transfer(&self, src: &Object, dst: &PathKey) {
        src.fs().dir_cache().flush(&parent_key(src.path()));
        self.dir_cache().flush(&parent_key(dst));
    }

    /// Move the directory `src` of `src_fs` to `dst` on this filesystem
    pub async fn dir_move(
        &self,
        src_fs: &Fs,
        src: &PathKey,
        dst: &PathKey,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let src_full = src_fs.full_path(src);
        let dst_full = self.full_path(dst);
        if !self.same_instance(src_fs) || src_full == "/" || dst_full == "/" {
            return Err(FsError::unsupported(Fallback::DirMove, src_full, dst_full));
        }

        src_fs.find_dir(src, false, cancel).await?;
        match self.inner().resolver().resolve(&dst_full, cancel).await {
            Ok(_) => return Err(FsError::Conflict(dst_full)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        let dst_dir_id = self.find_dir(&parent_key(dst), true, cancel).await?;

        let remote = self.inner().remote();
        let (from, to) = (src_full.as_str(), dst_full.as_str());
        let result = self
            .inner()
            .paced(cancel, move || remote.recursive_move(from, to, false))
            .await;

        let outcome = match result {
            Ok(()) => Ok(()),
            Err(e) if is_conflict(&e) => Err(FsError::Conflict(dst_full.clone())),
            Err(e) if is_unsupported(&e) || is_missing_route(&e) => {
                tracing::debug!(src = %src_full, dst = %dst_full, error = %e, "recursive move unavailable, falling back");
                self.dir_move_fallback(&src_full, &dst_full, dst_dir_id.as_str(), cancel)
                    .await
            }
            Err(e) => Err(e.into_fs_error(&src_full)),
        };

        src_fs.dir_cache().flush(&parent_key(src));
        self.dir_cache().flush(&parent_key(dst));
        outcome?;
        tracing::debug!(src = %src_full, dst = %dst_full, "moved directory");
        Ok(())
    }

    async fn dir_move_fallback(
        &self,
        src_full: &str,
        dst_full: &str,
        dst_dir: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (src_dir, src_leaf) = split_remote(src_full);
        let (_, dst_leaf) = split_remote(dst_full);
        let remote = self.inner().remote();

        let result = if src_dir == dst_dir {
            if src_leaf == dst_leaf {
                return Ok(());
            }
            self.inner()
                .paced(cancel, move || remote.rename(src_full, dst_leaf))
                .await
        } else if src_leaf == dst_leaf {
            let names = [src_leaf.to_string()];
            let names_ref = &names;
            self.inner()
                .paced(cancel, move || remote.move_items(src_dir, dst_dir, names_ref))
                .await
        } else {
            return Err(FsError::unsupported(Fallback::DirMove, src_full, dst_full));
        };
        result.map_err(|e| transfer_error(e, Fallback::DirMove, src_full, dst_full))
    }
}

impl Object {
    /// The same content addressed at `path` of `fs`, trusted only as far
    /// as `self` was
    fn relocated(&self, fs: Fs, path: PathKey, parent: Option<DirId>) -> Object {
        let id = fs.inner().encoder().encode(path.leaf());
        let mut object = Object::from_parts(
            fs,
            path,
            Some(id),
            parent,
            self.modified(),
            self.size(),
            self.md5().clone(),
        );
        object.authoritative = self.is_authoritative();
        object
    }
}
