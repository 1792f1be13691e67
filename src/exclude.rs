//! Admission filtering: hidden files, empty files, and size-based
//! exclusion rules.

use crate::config::Config;
use crate::file::FileRec;

/// A single size-based exclusion condition.
///
/// The core only ever evaluates these size variants; jdupes.c's `dir:`
/// exclusion tag lives in the walker/CLI layer instead, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludeRule {
    SizeEq(u64),
    SizeLt(u64),
    SizeLtEq(u64),
    SizeGt(u64),
    SizeGtEq(u64),
}

impl ExcludeRule {
    fn matches(&self, size: u64) -> bool {
        match *self {
            ExcludeRule::SizeEq(n) => size == n,
            ExcludeRule::SizeLt(n) => size < n,
            ExcludeRule::SizeLtEq(n) => size <= n,
            ExcludeRule::SizeGt(n) => size > n,
            ExcludeRule::SizeGtEq(n) => size >= n,
        }
    }
}

/// Decide whether a single admitted-by-stat file survives exclusion.
/// Must be called only after the file's metadata has been stat'd.
pub fn admit(file: &FileRec, cfg: &Config, will_hardlink: bool) -> bool {
    use crate::flags::FileFlags;

    if cfg.exclude_hidden {
        if let Some(name) = file.path.file_name() {
            let name = name.to_string_lossy();
            if name.starts_with('.') && name != "." && name != ".." {
                log::trace!("excluding hidden file {}", file.path.display());
                return false;
            }
        }
    }

    let is_regular = !file.flags.contains(FileFlags::IS_SYMLINK) && file.stat.size >= 0;
    if is_regular && file.stat.size == 0 && !cfg.include_empty {
        log::trace!("excluding empty file {}", file.path.display());
        return false;
    }

    if is_regular {
        let size = file.stat.size as u64;
        if cfg.exclude_rules.iter().any(|rule| rule.matches(size)) {
            log::trace!("excluding {} due to size exclusion rule", file.path.display());
            return false;
        }
    }

    if will_hardlink {
        if let Some(limit) = crate::platform::hardlink_limit() {
            if file.stat.nlink >= limit {
                log::trace!("excluding {} due to platform hard-link ceiling", file.path.display());
                return false;
            }
        }
    }

    true
}
