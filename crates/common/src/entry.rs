//! Directory identifiers and listing entries

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::PathKey;

/// Backend-assigned reference to a directory.
///
/// Backends without a separate identifier space store the absolute remote
/// path here. Callers outside the backend only compare and display it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirId(String);

impl DirId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DirId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A directory seen while listing its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Decoded display name
    pub name: String,
    /// Path relative to the filesystem root
    pub path: PathKey,
    pub id: DirId,
    pub parent: DirId,
    pub modified: DateTime<Utc>,
}

/// MD5 of an object's content.
///
/// Listings may omit hashes, so an empty listing hash means `Unfetched`:
/// a dedicated metadata round trip can still produce one. Only a metadata
/// response without a hash makes it `Missing`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Md5 {
    #[default]
    Unfetched,
    Missing,
    Known(String),
}

impl Md5 {
    /// State after a listing reported `hash`
    pub fn from_listing(hash: Option<String>) -> Self {
        match hash {
            Some(h) if !h.is_empty() => Md5::Known(h.to_ascii_lowercase()),
            _ => Md5::Unfetched,
        }
    }

    /// State after a metadata fetch reported `hash`
    pub fn from_metadata(hash: Option<String>) -> Self {
        match hash {
            Some(h) if !h.is_empty() => Md5::Known(h.to_ascii_lowercase()),
            _ => Md5::Missing,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Md5::Known(h) => Some(h),
            _ => None,
        }
    }

    pub fn needs_fetch(&self) -> bool {
        matches!(self, Md5::Unfetched)
    }
}
