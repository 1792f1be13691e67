//! One CLI root argument in, a stream of admitted `FileId`s out. Directory
//! recursion orders pending directories by inode descending so traversal
//! stays roughly sequential on disk, even though nothing here requires a
//! particular visit order.

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::exclude;
use crate::file::{FileArena, FileId, FileRec};
use crate::ledger::{TraversalLedger, VisitResult};
use crate::stat::FileStat;
use std::collections::BinaryHeap;
use std::fs;
use std::path::{Path, PathBuf};

/// jdupes.c's scratch path buffer is `PATH_MAX`-ish; `PathBuf` has no
/// fixed size, but an absurdly long path is still treated as a fatal
/// condition rather than silently handled.
const MAX_PATH_LEN: usize = 32 * 1024;

fn order_key(inode: u64) -> u64 {
    !(inode >> 8)
}

/// Walk `root`, calling `on_file` for every admitted regular file.
///
/// `recurse` controls whether directories beneath `root` itself are
/// descended into; `root`'s own immediate children are always visited.
pub fn walk_root(
    arena: &mut FileArena,
    ledger: &mut TraversalLedger,
    root: &Path,
    user_order: u32,
    recurse: bool,
    cfg: &Config,
    cancel: &CancellationToken,
    on_file: &mut dyn FnMut(FileId),
) -> Result<()> {
    let meta = fs::symlink_metadata(root).map_err(|e| EngineError::from_io(root, e))?;
    let meta = if meta.file_type().is_symlink() && cfg.follow_symlinks {
        fs::metadata(root).map_err(|e| EngineError::from_io(root, e))?
    } else {
        meta
    };

    if !meta.is_dir() {
        return admit_file(arena, root, user_order, cfg, on_file);
    }

    #[cfg(unix)]
    let root_device = {
        use std::os::unix::fs::MetadataExt;
        meta.dev()
    };
    #[cfg(not(unix))]
    let root_device = 0u64;

    let mut queue: BinaryHeap<(u64, PathBuf)> = BinaryHeap::new();
    queue.push((0, root.to_path_buf()));
    let mut depth0 = true;

    while let Some((_, dir)) = queue.pop() {
        if cancel.is_set() {
            return Err(EngineError::Aborted);
        }
        let allow_children = depth0 || recurse;
        depth0 = false;
        if let Err(e) = visit_dir(arena, ledger, &dir, user_order, allow_children, root_device, cfg, cancel, &mut queue, on_file) {
            if e.is_per_file() {
                log::warn!("{e}");
            } else {
                return Err(e);
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn visit_dir(
    arena: &mut FileArena,
    ledger: &mut TraversalLedger,
    dir: &Path,
    user_order: u32,
    allow_children: bool,
    root_device: u64,
    cfg: &Config,
    cancel: &CancellationToken,
    queue: &mut BinaryHeap<(u64, PathBuf)>,
    on_file: &mut dyn FnMut(FileId),
) -> Result<()> {
    let stat = FileStat::acquire(dir)?;
    if matches!(ledger.visit_or_skip(stat.inode, stat.device), VisitResult::Repeat) {
        return Ok(());
    }

    let entries = fs::read_dir(dir).map_err(|e| EngineError::from_io(dir, e))?;
    for entry in entries {
        if cancel.is_set() {
            return Err(EngineError::Aborted);
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("error reading an entry of {}: {e}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        if let Some(name) = path.file_name() {
            if cfg.exclude_names.contains(name) {
                log::trace!("excluding {} by name rule", path.display());
                continue;
            }
        }
        if path.as_os_str().len() > MAX_PATH_LEN {
            return Err(EngineError::PathOverflow { path });
        }

        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                log::warn!("{}: {e}", path.display());
                continue;
            }
        };

        if file_type.is_symlink() {
            if !cfg.follow_symlinks {
                continue;
            }
            match fs::metadata(&path) {
                Ok(target) if target.is_dir() => {
                    maybe_queue_dir(&path, allow_children, root_device, cfg, queue);
                }
                Ok(target) if target.is_file() => {
                    report(admit_file(arena, &path, user_order, cfg, on_file))?;
                }
                _ => {}
            }
            continue;
        }

        if file_type.is_dir() {
            maybe_queue_dir(&path, allow_children, root_device, cfg, queue);
            continue;
        }

        if file_type.is_file() {
            report(admit_file(arena, &path, user_order, cfg, on_file))?;
        }
    }
    Ok(())
}

fn maybe_queue_dir(path: &Path, allow_children: bool, root_device: u64, cfg: &Config, queue: &mut BinaryHeap<(u64, PathBuf)>) {
    if !allow_children {
        return;
    }
    match FileStat::acquire(path) {
        Ok(s) => {
            if cfg.one_filesystem && s.device != root_device {
                log::trace!("not crossing filesystem boundary into {}", path.display());
                return;
            }
            queue.push((order_key(s.inode), path.to_path_buf()));
        }
        Err(e) => log::warn!("{e}"),
    }
}

/// Per-file errors are logged and swallowed; anything else propagates.
fn report(result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_per_file() => {
            log::warn!("{e}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn admit_file(arena: &mut FileArena, path: &Path, user_order: u32, cfg: &Config, on_file: &mut dyn FnMut(FileId)) -> Result<()> {
    let stat = FileStat::acquire(path)?;
    let rec = FileRec::new(path.to_path_buf(), stat, user_order);
    if !exclude::admit(&rec, cfg, cfg.consider_hardlinks) {
        return Ok(());
    }
    let id = arena.alloc(rec);
    on_file(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_directory_admits_every_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"1").unwrap();
        std::fs::write(dir.path().join("b"), b"22").unwrap();

        let mut arena = FileArena::new();
        let mut ledger = TraversalLedger::new();
        let cfg = Config::default();
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        walk_root(&mut arena, &mut ledger, dir.path(), 0, false, &cfg, &cancel, &mut |id| seen.push(id)).unwrap();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn without_recurse_nested_dirs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("top"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep"), b"2").unwrap();

        let mut arena = FileArena::new();
        let mut ledger = TraversalLedger::new();
        let cfg = Config::default();
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        walk_root(&mut arena, &mut ledger, dir.path(), 0, false, &cfg, &cancel, &mut |id| seen.push(id)).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(arena.get(seen[0]).path.file_name().unwrap(), "top");
    }

    #[test]
    fn with_recurse_nested_dirs_are_visited() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("top"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep"), b"2").unwrap();

        let mut arena = FileArena::new();
        let mut ledger = TraversalLedger::new();
        let cfg = Config::default();
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        walk_root(&mut arena, &mut ledger, dir.path(), 0, true, &cfg, &cancel, &mut |id| seen.push(id)).unwrap();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn a_single_file_root_is_admitted_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("only");
        std::fs::write(&path, b"1").unwrap();

        let mut arena = FileArena::new();
        let mut ledger = TraversalLedger::new();
        let cfg = Config::default();
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        walk_root(&mut arena, &mut ledger, &path, 0, false, &cfg, &cancel, &mut |id| seen.push(id)).unwrap();
        assert_eq!(seen.len(), 1);
    }
}
