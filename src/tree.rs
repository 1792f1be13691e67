//! A single run-wide unbalanced binary tree, the same shape as jdupes.c's
//! `filetree_t`/`checkmatch()`. A balanced structure would work too, but
//! nothing is gained here: the comparator itself is the interesting part,
//! not the tree shape. Nodes hold `FileId`s into the shared
//! [`crate::file::FileArena`] rather than pointers, since the arena is
//! the sole owner.

use crate::config::Config;
use crate::file::{FileArena, FileId};
use crate::{cancel::CancellationToken, error::Result, hasher};
use std::cmp::Ordering;

struct TreeNode {
    file: FileId,
    left: Option<Box<TreeNode>>,
    right: Option<Box<TreeNode>>,
}

/// What inserting a new candidate against the tree produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No existing resident matched; the file became a new leaf.
    Inserted,
    /// The new file shares `(inode, device)` with an existing resident and
    /// `consider_hardlinks` is off. Per jdupes.c's `checkmatch()`, this is
    /// a dead end: the file is dropped without being inserted anywhere in
    /// the tree, so it cannot match anything discovered afterwards either.
    /// Preserved deliberately.
    HardlinkRejected,
    /// A match candidate was found.
    Candidate {
        existing: FileId,
        /// True when the match is a hardlink/same-inode short-circuit,
        /// which never needs byte confirmation.
        same_identity: bool,
    },
}

enum Step {
    ForceLeft,
    HardlinkMatch,
    HardlinkReject,
    Compare,
}

/// The run-wide comparison tree.
#[derive(Default)]
pub struct ComparisonTree {
    root: Option<Box<TreeNode>>,
}

impl ComparisonTree {
    pub fn new() -> Self {
        ComparisonTree { root: None }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Insert `new_file`, or return the candidate it matched.
    pub fn insert(
        &mut self,
        arena: &FileArena,
        new_file: FileId,
        cfg: &Config,
        chunk_size: usize,
        cancel: &CancellationToken,
    ) -> Result<MatchOutcome> {
        let Some(root) = self.root.as_mut() else {
            self.root = Some(Box::new(TreeNode { file: new_file, left: None, right: None }));
            return Ok(MatchOutcome::Inserted);
        };

        let mut current = root;
        loop {
            match step(arena, current.file, new_file, cfg) {
                Step::HardlinkMatch => return Ok(MatchOutcome::Candidate { existing: current.file, same_identity: true }),
                Step::HardlinkReject => return Ok(MatchOutcome::HardlinkRejected),
                Step::ForceLeft => {
                    if current.left.is_none() {
                        current.left = Some(Box::new(TreeNode { file: new_file, left: None, right: None }));
                        return Ok(MatchOutcome::Inserted);
                    }
                    current = current.left.as_mut().unwrap();
                }
                Step::Compare => {
                    let ord = compare_content(arena, current.file, new_file, cfg, chunk_size, cancel)?;
                    match ord {
                        Ordering::Equal => return Ok(MatchOutcome::Candidate { existing: current.file, same_identity: false }),
                        Ordering::Less => {
                            if current.left.is_none() {
                                current.left = Some(Box::new(TreeNode { file: new_file, left: None, right: None }));
                                return Ok(MatchOutcome::Inserted);
                            }
                            current = current.left.as_mut().unwrap();
                        }
                        Ordering::Greater => {
                            if current.right.is_none() {
                                current.right = Some(Box::new(TreeNode { file: new_file, left: None, right: None }));
                                return Ok(MatchOutcome::Inserted);
                            }
                            current = current.right.as_mut().unwrap();
                        }
                    }
                }
            }
        }
    }
}

/// Condition filters that short-circuit content comparison.
fn step(arena: &FileArena, resident: FileId, candidate: FileId, cfg: &Config) -> Step {
    let a = arena.get(resident);
    let b = arena.get(candidate);

    if cfg.isolate && a.user_order == b.user_order {
        return Step::ForceLeft;
    }
    if cfg.one_filesystem && a.stat.device != b.stat.device {
        return Step::ForceLeft;
    }
    if cfg.permissions_strict
        && (a.stat.mode != b.stat.mode || a.stat.uid != b.stat.uid || a.stat.gid != b.stat.gid)
    {
        return Step::ForceLeft;
    }
    if a.stat.inode == b.stat.inode && a.stat.device == b.stat.device {
        return if cfg.consider_hardlinks { Step::HardlinkMatch } else { Step::HardlinkReject };
    }
    Step::Compare
}

/// Size, then lazily-computed partial hash, then lazily-computed full
/// hash.
fn compare_content(
    arena: &FileArena,
    resident: FileId,
    candidate: FileId,
    cfg: &Config,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<Ordering> {
    let size_cmp = arena.get(resident).stat.size.cmp(&arena.get(candidate).stat.size);
    if size_cmp != Ordering::Equal {
        return Ok(size_cmp);
    }

    ensure_partial_hash(arena, resident, chunk_size, cancel)?;
    ensure_partial_hash(arena, candidate, chunk_size, cancel)?;

    let partial_cmp = arena.get(resident).partial_hash.cmp(&arena.get(candidate).partial_hash);
    if partial_cmp != Ordering::Equal {
        return Ok(partial_cmp);
    }

    let size = arena.get(resident).stat.size;
    let small_enough = size >= 0 && (size as u64) <= hasher::PARTIAL_HASH_SIZE as u64;
    if small_enough || cfg.partial_only {
        promote_partial_to_full(arena, resident);
        promote_partial_to_full(arena, candidate);
        return Ok(Ordering::Equal);
    }

    ensure_full_hash(arena, resident, chunk_size, cancel)?;
    ensure_full_hash(arena, candidate, chunk_size, cancel)?;

    Ok(arena.get(resident).full_hash.cmp(&arena.get(candidate).full_hash))
}

fn ensure_partial_hash(arena: &FileArena, id: FileId, chunk_size: usize, cancel: &CancellationToken) -> Result<()> {
    if arena.get(id).has_partial_hash() {
        return Ok(());
    }
    let path = arena.get(id).path.clone();
    let partial = hasher::hash_partial(&path, chunk_size, cancel)?;
    let mut rec = arena.get_mut(id);
    rec.partial_hash = partial.digest;
    rec.partial_state = Some(partial.state);
    rec.flags |= crate::flags::FileFlags::HASH_PARTIAL;
    Ok(())
}

fn ensure_full_hash(arena: &FileArena, id: FileId, chunk_size: usize, cancel: &CancellationToken) -> Result<()> {
    if arena.get(id).has_full_hash() {
        return Ok(());
    }
    let (path, partial) = {
        let rec = arena.get(id);
        let covered = hasher::PARTIAL_HASH_SIZE as u64;
        let state = rec.partial_state.clone().expect("partial hash computed before full hash");
        (rec.path.clone(), hasher::PartialHash { digest: rec.partial_hash, state, covered })
    };
    let digest = hasher::hash_full(&path, &partial, chunk_size, cancel)?;
    let mut rec = arena.get_mut(id);
    rec.full_hash = digest;
    rec.flags |= crate::flags::FileFlags::HASH_FULL;
    rec.partial_state = None;
    Ok(())
}

fn promote_partial_to_full(arena: &FileArena, id: FileId) {
    if arena.get(id).has_full_hash() {
        return;
    }
    let mut rec = arena.get_mut(id);
    rec.full_hash = rec.partial_hash;
    rec.flags |= crate::flags::FileFlags::HASH_FULL;
    rec.partial_state = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileRec;
    use crate::stat::FileStat;
    use std::io::Write;

    fn stat_for(size: i64, inode: u64) -> FileStat {
        FileStat { size, inode, device: 1, mode: 0o644, mtime: 0, birthtime: None, nlink: 1, uid: Some(0), gid: Some(0), is_symlink: false }
    }

    fn write_file(dir: &std::path::Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn identical_small_files_match_via_partial_hash_promotion() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = write_file(dir.path(), "a", b"hello");
        let b_path = write_file(dir.path(), "b", b"hello");

        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new(a_path, stat_for(5, 1), 1));
        let b = arena.alloc(FileRec::new(b_path, stat_for(5, 2), 1));

        let cfg = Config::default();
        let cancel = CancellationToken::new();
        let mut tree = ComparisonTree::new();

        assert_eq!(tree.insert(&arena, a, &cfg, 4096, &cancel).unwrap(), MatchOutcome::Inserted);
        let outcome = tree.insert(&arena, b, &cfg, 4096, &cancel).unwrap();
        assert_eq!(outcome, MatchOutcome::Candidate { existing: a, same_identity: false });
        assert!(arena.get(a).has_full_hash());
        assert!(arena.get(b).has_full_hash());
    }

    #[test]
    fn distinct_sizes_both_get_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = write_file(dir.path(), "a", b"hello");
        let b_path = write_file(dir.path(), "b", b"hello!!");

        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new(a_path, stat_for(5, 1), 1));
        let b = arena.alloc(FileRec::new(b_path, stat_for(7, 2), 1));

        let cfg = Config::default();
        let cancel = CancellationToken::new();
        let mut tree = ComparisonTree::new();
        assert_eq!(tree.insert(&arena, a, &cfg, 4096, &cancel).unwrap(), MatchOutcome::Inserted);
        assert_eq!(tree.insert(&arena, b, &cfg, 4096, &cancel).unwrap(), MatchOutcome::Inserted);
    }

    #[test]
    fn hardlink_without_consider_hardlinks_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = write_file(dir.path(), "a", b"hello");
        let b_path = a_path.clone();

        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new(a_path, stat_for(5, 42), 1));
        let b = arena.alloc(FileRec::new(b_path, stat_for(5, 42), 1));

        let cfg = Config::default();
        let cancel = CancellationToken::new();
        let mut tree = ComparisonTree::new();
        assert_eq!(tree.insert(&arena, a, &cfg, 4096, &cancel).unwrap(), MatchOutcome::Inserted);
        assert_eq!(tree.insert(&arena, b, &cfg, 4096, &cancel).unwrap(), MatchOutcome::HardlinkRejected);
    }

    #[test]
    fn hardlink_with_consider_hardlinks_matches() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = write_file(dir.path(), "a", b"hello");
        let b_path = a_path.clone();

        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new(a_path, stat_for(5, 42), 1));
        let b = arena.alloc(FileRec::new(b_path, stat_for(5, 42), 1));

        let mut cfg = Config::default();
        cfg.consider_hardlinks = true;
        let cancel = CancellationToken::new();
        let mut tree = ComparisonTree::new();
        assert_eq!(tree.insert(&arena, a, &cfg, 4096, &cancel).unwrap(), MatchOutcome::Inserted);
        let outcome = tree.insert(&arena, b, &cfg, 4096, &cancel).unwrap();
        assert_eq!(outcome, MatchOutcome::Candidate { existing: a, same_identity: true });
    }

    #[test]
    fn parameter_isolation_forbids_match() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = write_file(dir.path(), "a", b"hello");
        let b_path = write_file(dir.path(), "b", b"hello");

        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new(a_path, stat_for(5, 1), 1));
        let b = arena.alloc(FileRec::new(b_path, stat_for(5, 2), 1));

        let mut cfg = Config::default();
        cfg.isolate = true;
        let cancel = CancellationToken::new();
        let mut tree = ComparisonTree::new();
        assert_eq!(tree.insert(&arena, a, &cfg, 4096, &cancel).unwrap(), MatchOutcome::Inserted);
        assert_eq!(tree.insert(&arena, b, &cfg, 4096, &cancel).unwrap(), MatchOutcome::Inserted);
    }
}
