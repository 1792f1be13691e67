//! Re-stat and compare a previously admitted file against its stored
//! snapshot.
//!
//! Long scans can outlive the files they're scanning. Before acting on a
//! stored match (deleting, linking) the caller re-stats and compares
//! against the original snapshot, the same defense jdupes.c applies right
//! before unlinking a duplicate.

use crate::error::Result;
use crate::file::{FileArena, FileId};
use crate::stat::FileStat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Unchanged,
    Changed,
    Gone,
}

/// Re-stat `id`'s path and compare against its stored snapshot.
///
/// Does not mutate the arena: a caller that wants to act on `Unchanged`
/// still holds the original, already-hashed `FileStat`.
pub fn check(arena: &FileArena, id: FileId) -> Result<ChangeStatus> {
    let (path, before) = {
        let rec = arena.get(id);
        (rec.path.clone(), rec.stat)
    };

    let after = match FileStat::acquire(&path) {
        Ok(stat) => stat,
        Err(crate::error::EngineError::FileGone { .. }) => return Ok(ChangeStatus::Gone),
        Err(e) => return Err(e),
    };

    if identity_matches(&before, &after) {
        Ok(ChangeStatus::Unchanged)
    } else {
        Ok(ChangeStatus::Changed)
    }
}

fn identity_matches(before: &FileStat, after: &FileStat) -> bool {
    before.size == after.size
        && before.inode == after.inode
        && before.device == after.device
        && before.mtime == after.mtime
        && before.mode == after.mode
        && before.is_symlink == after.is_symlink
        && before.uid == after.uid
        && before.gid == after.gid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileRec;

    #[test]
    fn untouched_file_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello").unwrap();
        let stat = FileStat::acquire(&path).unwrap();

        let mut arena = FileArena::new();
        let id = arena.alloc(FileRec::new(path, stat, 1));
        assert_eq!(check(&arena, id).unwrap(), ChangeStatus::Unchanged);
    }

    #[test]
    fn rewritten_file_is_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello").unwrap();
        let stat = FileStat::acquire(&path).unwrap();

        let mut arena = FileArena::new();
        let id = arena.alloc(FileRec::new(path.clone(), stat, 1));

        std::fs::write(&path, b"hello, much longer now").unwrap();
        assert_eq!(check(&arena, id).unwrap(), ChangeStatus::Changed);
    }

    #[test]
    fn deleted_file_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello").unwrap();
        let stat = FileStat::acquire(&path).unwrap();

        let mut arena = FileArena::new();
        let id = arena.alloc(FileRec::new(path.clone(), stat, 1));

        std::fs::remove_file(&path).unwrap();
        assert_eq!(check(&arena, id).unwrap(), ChangeStatus::Gone);
    }

    #[cfg(unix)]
    #[test]
    fn permission_change_is_detected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello").unwrap();
        let stat = FileStat::acquire(&path).unwrap();

        let mut arena = FileArena::new();
        let id = arena.alloc(FileRec::new(path.clone(), stat, 1));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert_eq!(check(&arena, id).unwrap(), ChangeStatus::Changed);
    }
}
