//! Replacing duplicate-group members with links to the group's head.
//!
//! Hardlink (or reflink) into a temp file next to the duplicate, then
//! rename over it, so a failure partway through never leaves the
//! duplicate missing.

use crate::change::{check, ChangeStatus};
use crate::error::Result;
use crate::file::{FileArena, FileId};
use crate::reflink::{reflink, reflink_or_hardlink, symlink, LinkType};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Hardlink,
    Reflink,
    ReflinkOrHardlink,
    /// `-l`/jdupes.c's symlink dedupe: replace the duplicate with a
    /// symlink pointing at the group's head instead of hard-linking it.
    Symlink,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LinkStats {
    pub hardlinks: usize,
    pub reflinks: usize,
    pub symlinks: usize,
    pub bytes_saved: u64,
    pub skipped_stale: usize,
    pub errors: usize,
}

/// Replace every non-head member of every group with a link to the head.
///
/// Every member is re-checked with [`crate::change::check`] immediately
/// before acting on it: a file the scan found that has since changed or
/// vanished is skipped rather than linked.
pub fn apply_links(arena: &FileArena, groups: &[Vec<FileId>], mode: LinkMode, dry_run: bool) -> Result<LinkStats> {
    let mut stats = LinkStats::default();
    for group in groups {
        let Some((&head, members)) = group.split_first() else { continue };
        if check(arena, head)? != ChangeStatus::Unchanged {
            stats.skipped_stale += group.len();
            continue;
        }
        let head_path = arena.get(head).path.clone();

        for &member in members {
            if check(arena, member)? != ChangeStatus::Unchanged {
                stats.skipped_stale += 1;
                continue;
            }
            let member_path = arena.get(member).path.clone();
            let size = arena.get(member).stat.size.max(0) as u64;

            if dry_run {
                log::info!("would link {} -> {}", member_path.display(), head_path.display());
                continue;
            }

            match link_one(&head_path, &member_path, mode, &mut stats) {
                Ok(()) => stats.bytes_saved += size,
                Err(e) => {
                    log::warn!("failed to link {}: {e}", member_path.display());
                    stats.errors += 1;
                }
            }
        }
    }
    Ok(stats)
}

fn link_one(head: &Path, member: &Path, mode: LinkMode, stats: &mut LinkStats) -> std::io::Result<()> {
    let temp_name = format!(".{}.dupe-krill-tmp", member.file_name().and_then(|n| n.to_str()).unwrap_or("x"));
    let temp = member.with_file_name(temp_name);

    let link_result = match mode {
        LinkMode::Hardlink => fs::hard_link(head, &temp).map(|()| LinkType::Hardlink),
        LinkMode::Reflink => reflink(head, &temp).map(|()| LinkType::Reflink),
        LinkMode::ReflinkOrHardlink => reflink_or_hardlink(head, &temp),
        LinkMode::Symlink => symlink(head, &temp).map(|()| LinkType::Symlink),
    };

    let kind = match link_result {
        Ok(kind) => kind,
        Err(e) => {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&temp, member) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    match kind {
        LinkType::Hardlink => stats.hardlinks += 1,
        LinkType::Reflink => stats.reflinks += 1,
        LinkType::Symlink => stats.symlinks += 1,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::{Engine, RootSpec};

    #[test]
    fn hardlinks_duplicate_into_head() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"payload payload payload").unwrap();
        std::fs::write(dir.path().join("b"), b"payload payload payload").unwrap();

        let mut engine = Engine::new(Config::default()).unwrap();
        let roots = vec![RootSpec { path: dir.path().to_path_buf(), recurse: false }];
        let report = engine.run(&roots).unwrap();
        assert_eq!(report.duplicate_groups.len(), 1);

        let stats = apply_links(engine.arena(), &report.duplicate_groups, LinkMode::Hardlink, false).unwrap();
        assert_eq!(stats.hardlinks, 1);
        assert_eq!(stats.errors, 0);

        let meta_a = std::fs::metadata(dir.path().join("a")).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let meta_b = std::fs::metadata(dir.path().join("b")).unwrap();
            assert_eq!(meta_a.ino(), meta_b.ino());
        }
    }

    #[test]
    fn dry_run_changes_nothing_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"payload payload payload").unwrap();
        std::fs::write(dir.path().join("b"), b"payload payload payload").unwrap();

        let mut engine = Engine::new(Config::default()).unwrap();
        let roots = vec![RootSpec { path: dir.path().to_path_buf(), recurse: false }];
        let report = engine.run(&roots).unwrap();

        let stats = apply_links(engine.arena(), &report.duplicate_groups, LinkMode::Hardlink, true).unwrap();
        assert_eq!(stats.hardlinks, 0);

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let meta_a = std::fs::metadata(dir.path().join("a")).unwrap();
            let meta_b = std::fs::metadata(dir.path().join("b")).unwrap();
            assert_ne!(meta_a.ino(), meta_b.ino());
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_mode_replaces_duplicate_with_a_symlink_to_head() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"payload payload payload").unwrap();
        std::fs::write(dir.path().join("b"), b"payload payload payload").unwrap();

        let mut engine = Engine::new(Config::default()).unwrap();
        let roots = vec![RootSpec { path: dir.path().to_path_buf(), recurse: false }];
        let report = engine.run(&roots).unwrap();

        let stats = apply_links(engine.arena(), &report.duplicate_groups, LinkMode::Symlink, false).unwrap();
        assert_eq!(stats.symlinks, 1);

        let target = std::fs::read_link(dir.path().join("b")).unwrap();
        assert_eq!(target, dir.path().join("a"));
    }
}
