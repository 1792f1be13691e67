//! Error kinds produced by the engine's core.

use std::io;
use std::path::PathBuf;

/// Errors the engine's core can produce.
///
/// Per-file errors (`FileGone`, `Io`, `AccessDenied`) are logged and the
/// offending record is dropped from whatever operation hit them; they
/// are not propagated as fatal. `PathOverflow`, `Oom` and `BadConfig`
/// are fatal. `Aborted` is the cooperative-cancellation sentinel.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `stat`/`open` failed on a path the engine had previously listed.
    #[error("file gone: {path}: {source}")]
    FileGone {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A read or seek failed mid-hash or mid-confirm.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `open()` was refused by the OS.
    #[error("access denied: {path}: {source}")]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A path exceeded the scratch path buffer. Fatal.
    #[error("path buffer overflow assembling {path}")]
    PathOverflow { path: PathBuf },

    /// Allocation failure. Fatal.
    #[error("out of memory: {0}")]
    Oom(&'static str),

    /// Conflicting configuration flags, detected at startup. Fatal.
    #[error("invalid configuration: {0}")]
    BadConfig(&'static str),

    /// Cooperative cancellation fired mid-operation.
    #[error("aborted")]
    Aborted,
}

impl EngineError {
    /// Classify a raw I/O error against a path, using the OS error kind to
    /// pick `FileGone` vs `AccessDenied` vs generic `Io`.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => EngineError::FileGone { path, source },
            io::ErrorKind::PermissionDenied => EngineError::AccessDenied { path, source },
            _ => EngineError::Io { path, source },
        }
    }

    /// True for the per-file error kinds that must be logged and dropped
    /// rather than propagated as fatal.
    pub fn is_per_file(&self) -> bool {
        matches!(self, EngineError::FileGone { .. } | EngineError::Io { .. } | EngineError::AccessDenied { .. })
    }
}

/// Shorthand result type used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
