//! Single-path attribute lookups
//!
//! One `fs/get` round trip per call, paced and cancellable. The resolver
//! reports what the server said and nothing more: it never touches the
//! directory cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{FsError, Md5, Pacer};
use tokio_util::sync::CancellationToken;

use crate::api::Item;
use crate::remote::Remote;

/// Attributes of one remote path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Absolute remote path that was resolved
    pub path: String,
    /// Name as the server spells it
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub md5: Md5,
    pub raw_url: Option<String>,
}

impl RemoteInfo {
    pub fn from_item(path: impl Into<String>, item: Item) -> Self {
        let size = item.size();
        Self {
            path: path.into(),
            name: item.name,
            is_dir: item.is_dir,
            size,
            modified: item.modified,
            md5: Md5::from_metadata(item.hash_info),
            raw_url: item.raw_url.filter(|url| !url.is_empty()),
        }
    }
}

#[derive(Clone)]
pub struct Resolver {
    remote: Arc<dyn Remote>,
    pacer: Arc<Pacer>,
}

impl Resolver {
    pub fn new(remote: Arc<dyn Remote>, pacer: Arc<Pacer>) -> Self {
        Self { remote, pacer }
    }

    /// Fetch the attributes of the absolute remote `path`.
    ///
    /// A missing path is [`FsError::NotFound`]; transient failures were
    /// already retried by the pacer.
    pub async fn resolve(&self, path: &str, cancel: &CancellationToken) -> Result<RemoteInfo, FsError> {
        let remote = &*self.remote;
        let item = self
            .pacer
            .call(cancel, move || remote.get_info(path))
            .await
            .map_err(|e| e.into_fs_error(path))?;
        tracing::debug!(path, is_dir = item.is_dir, size = item.size, "resolved metadata");
        Ok(RemoteInfo::from_item(path, item))
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("endpoint", &self.remote.endpoint().as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::api::ApiError;
    use crate::testing::MockRemote;

    fn resolver(mock: &Arc<MockRemote>) -> Resolver {
        Resolver::new(mock.clone(), Arc::new(Pacer::default()))
    }

    #[tokio::test]
    async fn test_resolve_file() {
        let mock = Arc::new(MockRemote::new());
        mock.add_file("/a/f.txt", b"hello", Some("5D41402ABC4B2A76B9719D911017C592"));

        let info = resolver(&mock)
            .resolve("/a/f.txt", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(info.name, "f.txt");
        assert!(!info.is_dir);
        assert_eq!(info.size, 5);
        assert_eq!(info.md5, Md5::Known("5d41402abc4b2a76b9719d911017c592".into()));
        assert_eq!(info.raw_url.as_deref(), Some("http://mock.invalid/d/a/f.txt"));
        assert_eq!(mock.calls("get_info"), 1);
    }

    #[tokio::test]
    async fn test_resolve_directory_and_missing_hash() {
        let mock = Arc::new(MockRemote::new());
        mock.add_dir("/a");
        mock.add_file("/a/nohash", b"x", None);
        let resolver = resolver(&mock);
        let cancel = CancellationToken::new();

        let dir = resolver.resolve("/a", &cancel).await.unwrap();
        assert!(dir.is_dir);
        assert_eq!(dir.raw_url, None);

        let file = resolver.resolve("/a/nohash", &cancel).await.unwrap();
        assert_eq!(file.md5, Md5::Missing);
    }

    #[tokio::test]
    async fn test_resolve_not_found_variants() {
        let mock = Arc::new(MockRemote::new());
        let resolver = resolver(&mock);
        let cancel = CancellationToken::new();

        let err = resolver.resolve("/missing", &cancel).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(ref p) if p == "/missing"));

        mock.add_file("/f", b"x", None);
        mock.fail_next("get_info", ApiError::api(404, "gone"));
        assert!(resolver.resolve("/f", &cancel).await.unwrap_err().is_not_found());

        mock.fail_next_status("get_info", StatusCode::NOT_FOUND);
        assert!(resolver.resolve("/f", &cancel).await.unwrap_err().is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_retries_server_errors() {
        let mock = Arc::new(MockRemote::new());
        mock.add_file("/f", b"x", None);
        mock.fail_next_status("get_info", StatusCode::BAD_GATEWAY);

        let info = resolver(&mock)
            .resolve("/f", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(info.size, 1);
        assert_eq!(mock.calls("get_info"), 2);
    }

    #[tokio::test]
    async fn test_resolve_other_errors_are_fatal() {
        let mock = Arc::new(MockRemote::new());
        mock.fail_next("get_info", ApiError::api(403, "permission denied"));
        let err = resolver(&mock)
            .resolve("/secret", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Fatal { code: Some(403), .. }));
    }
}
