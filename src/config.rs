//! Run configuration, consumed by every collaborator in the pipeline.

use crate::error::{EngineError, Result};

/// How directory recursion is requested for a given CLI argument.
///
/// jdupes.c distinguishes plain `-r` (recurse into every argument) from
/// `-R`/`--recurse:` (recurse only into arguments named after the flag).
/// The core only needs a final boolean per root; this enum is what the
/// CLI layer resolves down to that boolean from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recurse {
    #[default]
    Off,
    On,
    OnAfterMarker,
}

/// Sort key used by the duplicate-chain comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    Name,
    Mtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub(crate) fn sign(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Ascending
    }
}

/// The bundle of recognized options consumed by the core.
#[derive(Debug, Clone)]
pub struct Config {
    /// `-r`/`-R`: descend into subdirectories.
    pub recurse: Recurse,
    /// `-s`/--symlinks: follow symlinked files and directories.
    pub follow_symlinks: bool,
    /// `-1`/--one-file-system: don't cross device boundaries.
    pub one_filesystem: bool,
    /// `-z`/--zeromatch: admit zero-byte files.
    pub include_empty: bool,
    /// `-H`/--hardlinks: treat same-inode paths as a match.
    pub consider_hardlinks: bool,
    /// `-p`/--permissions: require matching mode/uid/gid to match.
    pub permissions_strict: bool,
    /// `-I`/--isolate: forbid matches within the same CLI argument.
    pub isolate: bool,
    /// `-T`/--partial-only: match on the partial hash alone.
    pub partial_only: bool,
    /// `-Q`/--quick: skip the byte-for-byte confirmation pass.
    pub quick: bool,
    /// `-C`/--chunksize: override the auto-tuned I/O chunk size.
    pub chunk_size_override: Option<usize>,
    /// `-o`/--order: sort key for duplicate chains.
    pub order_by: OrderBy,
    /// `-i`/--reverse: invert the sort order.
    pub sort_direction: SortDirection,
    /// `-O`/--paramorder: parameter order wins over `order_by`.
    pub param_order_tiebreak: bool,
    /// `-Z`/--softabort: let a first SIGINT end scanning gracefully.
    pub soft_abort: bool,
    /// `-A`/--nohidden: exclude dotfiles.
    pub exclude_hidden: bool,
    /// `-X`/`-x`: size-based exclusion stack, evaluated by C4.
    pub exclude_rules: Vec<crate::exclude::ExcludeRule>,
    /// Names rejected outright during directory enumeration (ambient:
    /// teacher's `Scanner::exclude`, supplementing jdupes.c's `dir:` tag).
    pub exclude_names: std::collections::HashSet<std::ffi::OsString>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            recurse: Recurse::default(),
            follow_symlinks: false,
            one_filesystem: false,
            include_empty: false,
            consider_hardlinks: false,
            permissions_strict: false,
            isolate: false,
            partial_only: false,
            quick: false,
            chunk_size_override: None,
            order_by: OrderBy::default(),
            sort_direction: SortDirection::default(),
            param_order_tiebreak: false,
            soft_abort: false,
            exclude_hidden: false,
            exclude_rules: Vec::new(),
            exclude_names: std::collections::HashSet::new(),
        }
    }
}

impl Config {
    /// Surface `BadConfig` for combinations the engine cannot honor:
    /// conflicting policy flags are fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if let Some(size) = self.chunk_size_override {
            if !(crate::hasher::MIN_CHUNK_SIZE..=crate::hasher::MAX_CHUNK_SIZE).contains(&size) {
                return Err(EngineError::BadConfig(
                    "chunk size override must be within [MIN_CHUNK_SIZE, MAX_CHUNK_SIZE]",
                ));
            }
        }
        if self.partial_only && self.quick {
            return Err(EngineError::BadConfig(
                "partial-only and quick mode cannot both be set: partial-only already skips full hashing, and quick additionally skips confirmation, leaving nothing to compare matches against",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_only_and_quick_is_rejected() {
        let mut cfg = Config::default();
        cfg.partial_only = true;
        cfg.quick = true;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn chunk_size_override_out_of_range_is_rejected() {
        let mut cfg = Config::default();
        cfg.chunk_size_override = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }
}
