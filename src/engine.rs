//! Ties every other component into one pass over the CLI root arguments:
//! walk, insert into the comparison tree, confirm, register. State lives
//! behind the file arena rather than a web of shared, ref-counted cells.

use crate::cancel::{CancellationToken, RuntimeFlag};
use crate::config::Config;
use crate::confirm;
use crate::error::{EngineError, Result};
use crate::file::{FileArena, FileId};
use crate::group;
use crate::ledger::TraversalLedger;
use crate::tree::{ComparisonTree, MatchOutcome};
use crate::{hasher, walker};
use std::path::PathBuf;

/// One CLI argument, with recursion already resolved to a plain boolean
/// (see DESIGN.md for how `-R`'s marker-argument convention resolves to
/// this).
#[derive(Debug, Clone)]
pub struct RootSpec {
    pub path: PathBuf,
    pub recurse: bool,
}

/// Run-wide counters for ambient observability.
#[derive(Debug, Default, Clone, Copy)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Stats {
    pub admitted: usize,
    pub hardlink_matches: usize,
    pub hash_matches_confirmed: usize,
    pub hash_collisions_rejected: usize,
    pub duplicate_groups: usize,
    pub duplicate_files: usize,
    pub bytes_duplicated: u64,
}

/// The outcome of a full run: every duplicate chain, already sorted for
/// presentation.
#[derive(Debug)]
pub struct RunReport {
    pub stats: Stats,
    pub duplicate_groups: Vec<Vec<FileId>>,
}

pub struct Engine {
    cfg: Config,
    arena: FileArena,
    tree: ComparisonTree,
    ledger: TraversalLedger,
    cancel: CancellationToken,
    soft_cancel: CancellationToken,
    soft_abort_flag: RuntimeFlag,
    chunk_size: usize,
    stats: Stats,
    heads: Vec<FileId>,
}

impl Engine {
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let chunk_size = hasher::auto_chunk_size(cfg.chunk_size_override);
        let soft_abort_flag = RuntimeFlag::new(cfg.soft_abort);
        Ok(Engine {
            cfg,
            arena: FileArena::new(),
            tree: ComparisonTree::new(),
            ledger: TraversalLedger::new(),
            cancel: CancellationToken::new(),
            soft_cancel: CancellationToken::new(),
            soft_abort_flag,
            chunk_size,
            stats: Stats::default(),
            heads: Vec::new(),
        })
    }

    /// Shared with a signal handler to request immediate, hard cancellation
    /// (a second SIGINT, or the only one when `soft_abort` is off).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Shared with a signal handler to request a graceful stop: the root
    /// currently being walked finishes, but no further roots are started
    /// (`-Z`/`--softabort`).
    pub fn soft_cancellation_token(&self) -> CancellationToken {
        self.soft_cancel.clone()
    }

    /// Shared with the SIGUSR1 handler so it can flip the soft-abort
    /// policy mid-run, matching jdupes.c's `sigusr1()` toggling
    /// `F_SOFTABORT` rather than only reading it once at startup.
    pub fn soft_abort_flag(&self) -> RuntimeFlag {
        self.soft_abort_flag.clone()
    }

    pub fn arena(&self) -> &FileArena {
        &self.arena
    }

    /// Walk every root in turn, feeding discovered files through C6-C8.
    pub fn run(&mut self, roots: &[RootSpec]) -> Result<RunReport> {
        for (order, root) in roots.iter().enumerate() {
            if self.cancel.is_set() {
                return Err(EngineError::Aborted);
            }
            if self.soft_cancel.is_set() {
                log::info!("soft abort requested; skipping remaining roots");
                break;
            }

            let Engine { arena, ledger, tree, cfg, chunk_size, cancel, stats, heads, .. } = self;
            let chunk_size = *chunk_size;

            let mut pending: Vec<FileId> = Vec::new();
            walker::walk_root(arena, ledger, &root.path, order as u32, root.recurse, cfg, cancel, &mut |id| pending.push(id))?;

            for id in pending {
                Self::process_one(arena, tree, cfg, chunk_size, cancel, stats, heads, id)?;
            }
        }

        let mut groups: Vec<Vec<FileId>> = self
            .heads
            .iter()
            .map(|&head| group::sorted_chain(&self.arena, &self.cfg, head))
            .filter(|chain| chain.len() > 1)
            .collect();
        groups.sort_by_key(|chain| chain[0]);

        Ok(RunReport { stats: self.stats, duplicate_groups: groups })
    }

    #[allow(clippy::too_many_arguments)]
    fn process_one(
        arena: &mut FileArena,
        tree: &mut ComparisonTree,
        cfg: &Config,
        chunk_size: usize,
        cancel: &CancellationToken,
        stats: &mut Stats,
        heads: &mut Vec<FileId>,
        id: FileId,
    ) -> Result<()> {
        stats.admitted += 1;
        let outcome = tree.insert(arena, id, cfg, chunk_size, cancel)?;
        match outcome {
            MatchOutcome::Inserted => {}
            MatchOutcome::HardlinkRejected => {
                log::trace!("{}: hardlink of an existing file, consider-hardlinks is off", arena.get(id).path.display());
            }
            MatchOutcome::Candidate { existing, same_identity } => {
                if same_identity {
                    stats.hardlink_matches += 1;
                    Self::register(arena, stats, heads, existing, id);
                    return Ok(());
                }

                if !confirm::should_confirm(cfg, false) {
                    stats.hash_matches_confirmed += 1;
                    Self::register(arena, stats, heads, existing, id);
                    return Ok(());
                }

                let a = arena.get(existing).path.clone();
                let b = arena.get(id).path.clone();
                match confirm::confirm(&a, &b, cancel) {
                    Ok(true) => {
                        stats.hash_matches_confirmed += 1;
                        Self::register(arena, stats, heads, existing, id);
                    }
                    Ok(false) => {
                        stats.hash_collisions_rejected += 1;
                        log::warn!("hash collision without byte match: {} vs {}", a.display(), b.display());
                    }
                    Err(e) if e.is_per_file() => log::warn!("{e}"),
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    fn register(arena: &FileArena, stats: &mut Stats, heads: &mut Vec<FileId>, head: FileId, new_file: FileId) {
        let already_head = arena.get(head).has_dupes();
        group::register_pair(arena, head, new_file);
        if !already_head {
            heads.push(head);
            stats.duplicate_groups += 1;
        }
        stats.duplicate_files += 1;
        let size = arena.get(new_file).stat.size;
        if size > 0 {
            stats.bytes_duplicated += size as u64;
        }
    }
}
