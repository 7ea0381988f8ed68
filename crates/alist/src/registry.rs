//! Backend factories keyed by the `type` field of a remote definition
//!
//! The registry is built once at startup and handed to whoever needs to
//! open filesystems.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{FsError, Result};
use tokio_util::sync::CancellationToken;

use crate::config::RemoteConfig;
use crate::fs::{Fs, RootKind};

/// Something that can open a filesystem from a remote definition
#[async_trait]
pub trait Backend: Send + Sync {
    /// Value of `type` this backend answers to
    fn kind(&self) -> &'static str;

    async fn connect(
        &self,
        name: &str,
        root: &str,
        config: &RemoteConfig,
        cancel: &CancellationToken,
    ) -> Result<(Fs, RootKind)>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlistBackend;

#[async_trait]
impl Backend for AlistBackend {
    fn kind(&self) -> &'static str {
        "alist"
    }

    async fn connect(
        &self,
        name: &str,
        root: &str,
        config: &RemoteConfig,
        cancel: &CancellationToken,
    ) -> Result<(Fs, RootKind)> {
        Fs::connect(name, root, config, cancel).await
    }
}

#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<&'static str, Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every backend this crate ships
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(AlistBackend);
        registry
    }

    /// Add `backend`, replacing any previous one of the same kind
    pub fn register(&mut self, backend: impl Backend + 'static) {
        self.backends.insert(backend.kind(), Arc::new(backend));
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.backends.keys().copied()
    }

    /// Open the remote `name` described by `config` at `root`
    pub async fn connect(
        &self,
        name: &str,
        root: &str,
        config: &RemoteConfig,
        cancel: &CancellationToken,
    ) -> Result<(Fs, RootKind)> {
        let backend = self.get(&config.backend).ok_or_else(|| {
            FsError::Config(format!(
                "remote {name:?} has unknown type {:?}",
                config.backend
            ))
        })?;
        tracing::debug!(remote = name, kind = backend.kind(), "opening remote");
        backend.connect(name, root, config, cancel).await
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}
