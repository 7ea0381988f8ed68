// Wire layer (Alist v3 HTTP API)
pub mod api;
pub mod remote;

// Filesystem layer
pub mod fs;
pub mod metadata;

// Configuration and backend lookup
pub mod config;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError};
pub use config::{Config, ConfigError, Credentials, RemoteConfig};
pub use fs::{Features, Fs, ListEntry, Object, RootKind};
pub use metadata::{RemoteInfo, Resolver};
pub use registry::{AlistBackend, Backend, BackendRegistry};
pub use remote::Remote;
