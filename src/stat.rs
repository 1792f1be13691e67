//! Acquires a non-dereferencing stat snapshot for an admitted path.

use crate::error::{EngineError, Result};
use crate::flags::FileFlags;
use std::fs;
use std::path::Path;
#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// A point-in-time snapshot of a file's identity-relevant metadata.
///
/// This is the payload behind `VALID_STAT`; it is also what [`crate::change`]
/// diffs against on a later re-stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: i64,
    pub inode: u64,
    pub device: u64,
    pub mode: u32,
    pub mtime: i64,
    pub birthtime: Option<i64>,
    pub nlink: u64,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub is_symlink: bool,
}

impl FileStat {
    /// The "unknown size" sentinel used before a successful stat, or
    /// permanently on a file stat() could not size.
    pub const UNKNOWN_SIZE: i64 = -1;

    fn unknown() -> Self {
        FileStat {
            size: Self::UNKNOWN_SIZE,
            inode: 0,
            device: 0,
            mode: 0,
            mtime: 0,
            birthtime: None,
            nlink: 0,
            uid: None,
            gid: None,
            is_symlink: false,
        }
    }

    /// `stat_into`: acquire metadata for `path`, via a non-dereferencing
    /// stat so the symlink bit can be observed.
    ///
    /// Idempotence is the caller's responsibility: a `FileRec` that
    /// already has `VALID_STAT` set must not call this again.
    pub fn acquire(path: &Path) -> Result<Self> {
        let meta = fs::symlink_metadata(path).map_err(|e| EngineError::from_io(path, e))?;
        Ok(Self::from_metadata(&meta))
    }

    #[cfg(unix)]
    fn from_metadata(meta: &fs::Metadata) -> Self {
        let is_symlink = meta.file_type().is_symlink();
        FileStat {
            size: meta.len() as i64,
            inode: meta.ino(),
            device: meta.dev(),
            mode: meta.mode(),
            mtime: meta.mtime(),
            birthtime: meta.created().ok().and_then(|t| {
                t.duration_since(std::time::UNIX_EPOCH).ok().map(|d| d.as_secs() as i64)
            }),
            nlink: meta.nlink(),
            uid: Some(meta.uid()),
            gid: Some(meta.gid()),
            is_symlink,
        }
    }

    #[cfg(not(unix))]
    fn from_metadata(meta: &fs::Metadata) -> Self {
        let is_symlink = meta.file_type().is_symlink();
        FileStat {
            size: meta.len() as i64,
            inode: 0,
            device: 0,
            mode: 0,
            mtime: meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
            birthtime: None,
            nlink: 1,
            uid: None,
            gid: None,
            is_symlink,
        }
    }

    /// A rejected/never-stat'd placeholder; `size` reads as "unknown".
    pub fn placeholder() -> Self {
        Self::unknown()
    }

    pub fn flags(&self) -> FileFlags {
        let mut flags = FileFlags::VALID_STAT;
        if self.is_symlink {
            flags |= FileFlags::IS_SYMLINK;
        }
        flags
    }
}
