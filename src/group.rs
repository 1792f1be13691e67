//! Confirmed duplicates become a singly-linked chain hanging off the tree
//! resident they matched, exactly like jdupes.c's `file->duplicates`
//! list built up by `registerpair()`. The chain is kept in whatever order
//! matches arrived in; presentation order is a separate, final sort (see
//! DESIGN.md).

use crate::config::{Config, OrderBy};
use crate::file::{FileArena, FileId};
use crate::flags::FileFlags;
use std::cmp::Ordering;

/// Link `new_file` into the duplicate chain headed at `head`.
///
/// `head` is the file the comparison tree already held; `new_file` is the
/// just-confirmed match. Only `head` carries `HAS_DUPES` — jdupes.c's
/// `registerpair()` keeps the flag on exactly one side of a pair, moving
/// it to whichever record becomes the new head rather than setting it on
/// every member. In this tree, the resident a file matched against never
/// changes identity once inserted, so `head` here is always that same
/// resident; `new_file` never becomes a head and must not carry the flag.
pub fn register_pair(arena: &FileArena, head: FileId, new_file: FileId) {
    let next = arena.get(head).duplicates;
    arena.get_mut(new_file).duplicates = next;
    arena.get_mut(head).duplicates = Some(new_file);
    arena.get_mut(head).flags |= FileFlags::HAS_DUPES;
    arena.get_mut(new_file).flags -= FileFlags::HAS_DUPES;
}

/// Walk `head`'s duplicate chain, `head` first, in link order.
pub fn collect_chain(arena: &FileArena, head: FileId) -> Vec<FileId> {
    let mut out = vec![head];
    let mut cur = arena.get(head).duplicates;
    while let Some(id) = cur {
        out.push(id);
        cur = arena.get(id).duplicates;
    }
    out
}

/// `collect_chain`, then ordered for presentation per `-o`/`-i`/`-O`.
pub fn sorted_chain(arena: &FileArena, cfg: &Config, head: FileId) -> Vec<FileId> {
    let mut chain = collect_chain(arena, head);
    chain.sort_by(|&a, &b| compare(arena, cfg, a, b));
    chain
}

fn compare(arena: &FileArena, cfg: &Config, a: FileId, b: FileId) -> Ordering {
    if cfg.param_order_tiebreak {
        let ra = arena.get(a);
        let rb = arena.get(b);
        let ord = ra.user_order.cmp(&rb.user_order);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    let ra = arena.get(a);
    let rb = arena.get(b);
    let base = match cfg.order_by {
        OrderBy::Name => ra.path.cmp(&rb.path),
        OrderBy::Mtime => ra.stat.mtime.cmp(&rb.stat.mtime),
    };
    apply_direction(base, cfg)
}

fn apply_direction(ord: Ordering, cfg: &Config) -> Ordering {
    let sign = cfg.sort_direction.sign();
    if sign >= 0 {
        ord
    } else {
        ord.reverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileRec;
    use crate::stat::FileStat;

    fn stat(mtime: i64) -> FileStat {
        FileStat { size: 1, inode: 1, device: 1, mode: 0, mtime, birthtime: None, nlink: 1, uid: Some(0), gid: Some(0), is_symlink: false }
    }

    #[test]
    fn chain_collects_in_link_order() {
        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new("a".into(), stat(1), 1));
        let b = arena.alloc(FileRec::new("b".into(), stat(2), 1));
        let c = arena.alloc(FileRec::new("c".into(), stat(3), 1));

        register_pair(&arena, a, b);
        register_pair(&arena, a, c);

        let chain = collect_chain(&arena, a);
        assert_eq!(chain, vec![a, c, b]);
        assert!(arena.get(a).has_dupes());
        assert!(!arena.get(b).has_dupes());
        assert!(!arena.get(c).has_dupes());
    }

    #[test]
    fn sorted_chain_orders_by_name_ascending() {
        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new("z".into(), stat(1), 1));
        let b = arena.alloc(FileRec::new("a".into(), stat(2), 1));
        register_pair(&arena, a, b);

        let cfg = Config::default();
        let sorted = sorted_chain(&arena, &cfg, a);
        assert_eq!(arena.get(sorted[0]).path, std::path::PathBuf::from("a"));
        assert_eq!(arena.get(sorted[1]).path, std::path::PathBuf::from("z"));
    }

    #[test]
    fn sorted_chain_honors_reverse_direction() {
        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new("z".into(), stat(1), 1));
        let b = arena.alloc(FileRec::new("a".into(), stat(2), 1));
        register_pair(&arena, a, b);

        let mut cfg = Config::default();
        cfg.sort_direction = crate::config::SortDirection::Descending;
        let sorted = sorted_chain(&arena, &cfg, a);
        assert_eq!(arena.get(sorted[0]).path, std::path::PathBuf::from("z"));
    }

    #[test]
    fn param_order_tiebreak_wins_over_name() {
        let mut arena = FileArena::new();
        let a = arena.alloc(FileRec::new("z".into(), stat(1), 2));
        let b = arena.alloc(FileRec::new("a".into(), stat(2), 1));
        register_pair(&arena, a, b);

        let mut cfg = Config::default();
        cfg.param_order_tiebreak = true;
        let sorted = sorted_chain(&arena, &cfg, a);
        assert_eq!(sorted[0], b);
        assert_eq!(sorted[1], a);
    }
}
