//! Canonical hierarchical paths
//!
//! A [`PathKey`] is the single canonical spelling of a slash-separated path:
//! always a leading slash, never a trailing one (except the root, which is the
//! lone `/`), no empty or `.` segments. Two keys are equal iff their canonical
//! strings are byte-equal, which is what the directory cache relies on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized, slash-separated path used as a directory-cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PathKey(String);

impl PathKey {
    /// The root marker
    pub const ROOT: &'static str = "/";

    /// The root path
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Parse any slash-separated path into its canonical form.
    ///
    /// Empty input, `/`, and runs of slashes all collapse to the root.
    /// `..` pops a segment and never climbs above the root.
    pub fn parse(path: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Self::root();
        }

        let mut key = String::with_capacity(path.len() + 1);
        for segment in segments {
            key.push('/');
            key.push_str(segment);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<PathKey> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(pos) => Some(Self(self.0[..pos].to_string())),
        }
    }

    /// Final segment, empty for the root
    pub fn leaf(&self) -> &str {
        if self.is_root() {
            return "";
        }
        match self.0.rfind('/') {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// Split into (parent, leaf). The root splits into (root, "").
    pub fn split(&self) -> (PathKey, &str) {
        (self.parent().unwrap_or_else(Self::root), self.leaf())
    }

    /// Append a child. `child` may itself contain slashes.
    pub fn join(&self, child: &str) -> PathKey {
        if self.is_root() {
            Self::parse(child)
        } else {
            Self::parse(&format!("{}/{}", self.0, child))
        }
    }

    /// Path segments from the top, empty for the root
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments below the root
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Every prefix of this path, root first, self last
    pub fn ancestors(&self) -> Vec<PathKey> {
        let mut out = vec![Self::root()];
        let mut current = Self::root();
        for segment in self.segments() {
            current = current.join(segment);
            out.push(current.clone());
        }
        out
    }

    /// True if `self` lies strictly below `other`
    pub fn is_descendant_of(&self, other: &PathKey) -> bool {
        if other.is_root() {
            return !self.is_root();
        }
        self.0.len() > other.0.len()
            && self.0.starts_with(&other.0)
            && self.0.as_bytes()[other.0.len()] == b'/'
    }

    /// True if `self` is `other` or lies below it
    pub fn is_within(&self, other: &PathKey) -> bool {
        self == other || self.is_descendant_of(other)
    }

    /// Path relative to the root, without the leading slash (`""` for the root)
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }
}

impl Default for PathKey {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PathKey {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for PathKey {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<PathKey> for String {
    fn from(key: PathKey) -> Self {
        key.0
    }
}
