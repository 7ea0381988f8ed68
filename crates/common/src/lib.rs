//! Backend-agnostic core of alistfs
//!
//! Path keys, name encoding, the directory resolution cache, the adaptive
//! retry pacer and the error taxonomy every filesystem verb reports through.

pub mod dir_cache;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod pacer;
pub mod path;

pub use dir_cache::{DirCache, DirCacher};
pub use encoding::{EncodingPolicy, NameEncoder};
pub use entry::{DirId, DirectoryEntry, Md5};
pub use error::{ErrorKind, Fallback, FsError, Result};
pub use pacer::{Pacer, PacerConfig, Retryable};
pub use path::PathKey;
