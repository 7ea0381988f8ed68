//! Filesystem verbs over an Alist remote
//!
//! [`Fs`] turns hierarchical paths into the fewest remote calls it can:
//! directories are resolved through the [`DirCache`], every call runs
//! through the shared [`Pacer`], and structural mutations flush the cache
//! subtrees they touch.

mod dir;
mod object;
mod transfer;


use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{DirCache, DirCacher, DirId, FsError, NameEncoder, Pacer, PathKey, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::{ApiClient, ApiError, Item};
use crate::config::{Credentials, RemoteConfig};
use crate::metadata::{RemoteInfo, Resolver};
use crate::remote::Remote;

pub use dir::ListEntry;
pub use object::Object;

/// What the configured root turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootKind {
    Directory,
    /// The root named a file; the filesystem was re-rooted at its parent
    /// and the file is reachable under this leaf name.
    File(String),
}

/// Capabilities of the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Features {
    pub case_insensitive: bool,
    pub can_have_empty_directories: bool,
    pub duplicate_files: bool,
    pub slow_hash: bool,
    pub partial_uploads: bool,
    pub server_side_move: bool,
    pub server_side_copy: bool,
    pub server_side_dir_move: bool,
    pub hashes: Vec<&'static str>,
    pub precision: Duration,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            can_have_empty_directories: true,
            duplicate_files: false,
            slow_hash: true,
            partial_uploads: true,
            server_side_move: true,
            server_side_copy: true,
            server_side_dir_move: true,
            hashes: vec!["md5"],
            precision: Duration::from_secs(1),
        }
    }
}

/// Join a remote directory and an already-encoded leaf
pub(crate) fn join_remote(dir: &str, leaf: &str) -> String {
    if dir == "/" || dir.is_empty() {
        format!("/{}", leaf)
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), leaf)
    }
}

/// Split an absolute remote path into its directory and leaf
pub(crate) fn split_remote(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some(("", leaf)) => ("/", leaf),
        Some((dir, leaf)) => (dir, leaf),
        None => ("/", path),
    }
}

/// Envelope 409 or an "already exists" message
pub(crate) fn is_already_exists(err: &ApiError) -> bool {
    match err {
        ApiError::Api { code, message } => *code == 409 || message.to_lowercase().contains("already"),
        _ => false,
    }
}

/// Server-side operation shape the backend rejected as invalid or unimplemented
pub(crate) fn is_unsupported(err: &ApiError) -> bool {
    matches!(err.api_code(), Some(400) | Some(501))
}

pub(crate) fn is_conflict(err: &ApiError) -> bool {
    err.api_code() == Some(403)
}

/// A connected Alist filesystem, cheap to clone and share across tasks
#[derive(Clone)]
pub struct Fs {
    inner: Arc<FsInner>,
}

pub(crate) struct FsInner {
    name: String,
    /// Absolute remote path of the root, in remote spelling
    root: String,
    remote: Arc<dyn Remote>,
    pacer: Arc<Pacer>,
    resolver: Resolver,
    cache: DirCache,
    encoder: NameEncoder,
    features: Features,
}

impl Fs {
    /// Connect over HTTP using `config`
    pub async fn connect(
        name: &str,
        root: &str,
        config: &RemoteConfig,
        cancel: &CancellationToken,
    ) -> Result<(Self, RootKind)> {
        let url = config
            .api_url()
            .map_err(|e| FsError::Config(e.to_string()))?;
        let client = ApiClient::new(&url).map_err(|e| FsError::Config(e.to_string()))?;
        Self::connect_with(name, root, config, Arc::new(client), cancel).await
    }

    /// Connect through an already-built [`Remote`]: ping, authenticate,
    /// then check whether the root names a file.
    pub async fn connect_with(
        name: &str,
        root: &str,
        config: &RemoteConfig,
        remote: Arc<dyn Remote>,
        cancel: &CancellationToken,
    ) -> Result<(Self, RootKind)> {
        config
            .validate()
            .map_err(|e| FsError::Config(e.to_string()))?;
        let credentials = config
            .credentials()
            .map_err(|e| FsError::Config(e.to_string()))?;
        let pacer = Arc::new(Pacer::new(config.pacer));

        let r = &*remote;
        pacer
            .call(cancel, move || r.ping())
            .await
            .map_err(|e| e.into_fs_error("/ping"))?;

        match credentials {
            Credentials::Token(token) => {
                remote.set_token(Some(token));
                let user = pacer
                    .call(cancel, move || r.whoami())
                    .await
                    .map_err(|e| e.into_fs_error("/api/me"))?;
                tracing::debug!(user, "validated static token");
            }
            Credentials::Login { username, password } => {
                let (u, p) = (username.as_str(), password.as_str());
                let token = pacer
                    .call(cancel, move || r.login(u, p))
                    .await
                    .map_err(|e| e.into_fs_error("/api/auth/login"))?;
                remote.set_token(Some(token));
            }
        }

        let encoder = NameEncoder::new(config.encoding);
        let root_key = config.resolve_root(root);
        let fs = Self::build(name, &root_key, remote.clone(), pacer.clone(), encoder);
        tracing::info!(remote = name, endpoint = %remote.endpoint(), root = %fs.root(), "connected");

        if root_key.is_root() {
            return Ok((fs, RootKind::Directory));
        }
        match fs.inner.resolver.resolve(fs.root(), cancel).await {
            Ok(info) if !info.is_dir => {
                let parent = root_key.parent().unwrap_or_else(PathKey::root);
                let leaf = root_key.leaf().to_string();
                tracing::info!(root = %parent, file = %leaf, "root is a file, using its parent");
                let fs = Self::build(name, &parent, remote, pacer, encoder);
                Ok((fs, RootKind::File(leaf)))
            }
            Ok(_) => Ok((fs, RootKind::Directory)),
            // A root that does not exist yet is created on first write
            Err(e) if e.is_not_found() => Ok((fs, RootKind::Directory)),
            Err(e) => Err(e),
        }
    }

    fn build(
        name: &str,
        root: &PathKey,
        remote: Arc<dyn Remote>,
        pacer: Arc<Pacer>,
        encoder: NameEncoder,
    ) -> Self {
        let root = encoder.encode_path(root.as_str());
        Self {
            inner: Arc::new(FsInner {
                name: name.to_string(),
                cache: DirCache::new(DirId::new(root.clone())),
                resolver: Resolver::new(remote.clone(), pacer.clone()),
                root,
                remote,
                pacer,
                encoder,
                features: Features::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Absolute remote path of the root
    pub fn root(&self) -> &str {
        &self.inner.root
    }

    pub fn features(&self) -> &Features {
        &self.inner.features
    }

    pub fn endpoint(&self) -> &Url {
        self.inner.remote.endpoint()
    }

    /// Whether server-side operations between `self` and `other` are possible
    pub fn same_instance(&self, other: &Fs) -> bool {
        self.endpoint() == other.endpoint()
    }

    pub fn dir_cache(&self) -> &DirCache {
        &self.inner.cache
    }

    /// Forget every resolved directory
    pub fn dir_cache_flush(&self) {
        self.inner.cache.reset_root();
    }

    pub fn pacer(&self) -> &Pacer {
        &self.inner.pacer
    }

    /// Absolute remote path for a path relative to the root
    pub fn full_path(&self, path: &PathKey) -> String {
        self.inner.full_path(path)
    }

    /// Attributes of `path` straight from the server
    pub async fn stat(&self, path: &PathKey, cancel: &CancellationToken) -> Result<RemoteInfo> {
        let full = self.full_path(path);
        self.inner.resolver.resolve(&full, cancel).await
    }

    pub(crate) async fn find_dir(
        &self,
        path: &PathKey,
        create: bool,
        cancel: &CancellationToken,
    ) -> Result<DirId> {
        let inner = &*self.inner;
        inner.cache.find_dir(inner, path, create, cancel).await
    }

    pub(crate) async fn find_path(
        &self,
        path: &PathKey,
        create: bool,
        cancel: &CancellationToken,
    ) -> Result<(String, DirId)> {
        let inner = &*self.inner;
        inner.cache.find_path(inner, path, create, cancel).await
    }

    pub(crate) fn inner(&self) -> &FsInner {
        &self.inner
    }
}

impl std::fmt::Debug for Fs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fs")
            .field("name", &self.inner.name)
            .field("root", &self.inner.root)
            .field("endpoint", &self.endpoint().as_str())
            .finish()
    }
}

impl std::fmt::Display for Fs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "alist root '{}'", self.inner.root)
    }
}

impl FsInner {
    pub(crate) fn remote(&self) -> &dyn Remote {
        &*self.remote
    }

    pub(crate) fn encoder(&self) -> &NameEncoder {
        &self.encoder
    }

    pub(crate) fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub(crate) fn full_path(&self, path: &PathKey) -> String {
        if path.is_root() {
            return self.root.clone();
        }
        join_remote(&self.root, &self.encoder.encode_path(path.relative()))
    }

    /// Run one remote call through the pacer, keeping the raw API error
    pub(crate) async fn paced<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: F,
    ) -> std::result::Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ApiError>>,
    {
        self.pacer.call(cancel, operation).await
    }

    /// Children of the absolute remote directory `path`. A directory the
    /// server no longer knows lists as empty.
    pub(crate) async fn list_items(&self, path: &str, cancel: &CancellationToken) -> Result<Vec<Item>> {
        let remote = self.remote();
        match self.paced(cancel, move || remote.list(path)).await {
            Ok(items) => Ok(items),
            Err(e) if e.is_not_found() => {
                tracing::debug!(path, "listing reported not found, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into_fs_error(path)),
        }
    }

    /// Create the absolute remote directory `path`; existing is fine
    pub(crate) async fn make_dir(&self, path: &str, cancel: &CancellationToken) -> Result<()> {
        let remote = self.remote();
        match self.paced(cancel, move || remote.mkdir(path)).await {
            Ok(()) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                tracing::debug!(path, "directory already exists");
                Ok(())
            }
            Err(e) => Err(e.into_fs_error(path)),
        }
    }
}

#[async_trait]
impl DirCacher for FsInner {
    async fn list_dirs(
        &self,
        parent: &DirId,
        cancel: &CancellationToken,
    ) -> Result<Vec<(String, DirId)>> {
        let items = self.list_items(parent.as_str(), cancel).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.is_dir)
            .map(|item| {
                let id = DirId::new(join_remote(parent.as_str(), &item.name));
                (self.encoder.decode(&item.name), id)
            })
            .collect())
    }

    async fn create_dir(
        &self,
        parent: &DirId,
        leaf: &str,
        cancel: &CancellationToken,
    ) -> Result<DirId> {
        let path = join_remote(parent.as_str(), &self.encoder.encode(leaf));
        self.make_dir(&path, cancel).await?;
        Ok(DirId::new(path))
    }
}
