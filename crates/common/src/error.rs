//! Error taxonomy shared by every filesystem verb
//!
//! Callers branch on [`FsError::kind`] rather than on messages. Not-found,
//! conflict and unsupported outcomes are ordinary control flow: creation
//! verbs treat conflicts as success, and an unsupported server-side
//! operation tells the caller to fall back to a client-side transfer.

use std::fmt;

/// Coarse classification of an [`FsError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    NotFound,
    Conflict,
    Unsupported,
    Cancelled,
    Fatal,
}

/// Server-side operation that could not be performed and must be emulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Copy,
    Move,
    DirMove,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Copy => write!(f, "copy"),
            Fallback::Move => write!(f, "move"),
            Fallback::DirMove => write!(f, "directory move"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("transient failure on {path}: {message}")]
    Transient {
        path: String,
        status: Option<u16>,
        message: String,
    },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("directory not found: {0}")]
    DirNotFound(String),

    #[error("destination exists: {0}")]
    Conflict(String),

    #[error("can't {op} server-side: {src} -> {dst}")]
    Unsupported {
        op: Fallback,
        src: String,
        dst: String,
    },

    #[error("directory not empty: {0}")]
    NotEmpty(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{path}: {message} (code {})", .code.map(|c| c.to_string()).unwrap_or_else(|| "-".into()))]
    Fatal {
        path: String,
        code: Option<u16>,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::Transient { .. } => ErrorKind::Transient,
            FsError::NotFound(_) | FsError::DirNotFound(_) => ErrorKind::NotFound,
            FsError::Conflict(_) => ErrorKind::Conflict,
            FsError::Unsupported { .. } => ErrorKind::Unsupported,
            FsError::Cancelled => ErrorKind::Cancelled,
            FsError::NotEmpty(_) | FsError::Fatal { .. } | FsError::Config(_) => ErrorKind::Fatal,
        }
    }

    pub fn unsupported(op: Fallback, src: impl Into<String>, dst: impl Into<String>) -> Self {
        FsError::Unsupported {
            op,
            src: src.into(),
            dst: dst.into(),
        }
    }

    pub fn fatal(path: impl Into<String>, code: Option<u16>, message: impl Into<String>) -> Self {
        FsError::Fatal {
            path: path.into(),
            code,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// The fallback this error asks the caller to perform, if any
    pub fn fallback(&self) -> Option<Fallback> {
        match self {
            FsError::Unsupported { op, .. } => Some(*op),
            _ => None,
        }
    }
}

pub type Result<T, E = FsError> = std::result::Result<T, E>;
