//! Deleting all but a chosen subset of each duplicate group.
//!
//! jdupes.c's `deletefiles()` is reached two ways (`jdupes.c` around its
//! `F_NOPROMPT` check): with prompting, it reads a line from stdin naming
//! which set members to *preserve*; without it, the first member of each
//! group is preserved and the rest are removed unconditionally. Both modes
//! are modeled here; the prompt is driven over generic `Read`/`Write`
//! handles so it can be exercised without a real terminal.

use crate::change::{check, ChangeStatus};
use crate::error::Result;
use crate::file::{FileArena, FileId};
use std::fs;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// `-N`/jdupes.c's `F_NOPROMPT`: keep the first file in each group,
    /// delete the rest without asking.
    NoPrompt,
    /// Ask which members of each group to preserve.
    Prompt,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteStats {
    pub deleted: usize,
    pub preserved: usize,
    pub skipped_stale: usize,
    pub errors: usize,
}

/// Delete duplicates out of every group, per `mode`.
///
/// Every candidate for deletion is re-checked with [`crate::change::check`]
/// immediately before the `remove_file` call; anything that changed or
/// vanished since the scan is skipped rather than removed.
pub fn delete_duplicates(
    arena: &FileArena,
    groups: &[Vec<FileId>],
    mode: DeleteMode,
    dry_run: bool,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<DeleteStats> {
    let mut stats = DeleteStats::default();
    for (index, group) in groups.iter().enumerate() {
        if group.len() < 2 {
            continue;
        }

        let preserve = match mode {
            DeleteMode::NoPrompt => vec![0],
            DeleteMode::Prompt => prompt_preserve_set(arena, group, index, groups.len(), input, output)?,
        };

        for (member_index, &id) in group.iter().enumerate() {
            if preserve.contains(&member_index) {
                stats.preserved += 1;
                continue;
            }
            if check(arena, id)? != ChangeStatus::Unchanged {
                stats.skipped_stale += 1;
                continue;
            }

            let path = &arena.get(id).path;
            if dry_run {
                log::info!("would delete {}", path.display());
                stats.deleted += 1;
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => stats.deleted += 1,
                Err(e) => {
                    log::warn!("failed to delete {}: {e}", path.display());
                    stats.errors += 1;
                }
            }
        }
    }
    Ok(stats)
}

/// Print one group and read back the set of 1-based indices to preserve.
///
/// An empty line preserves only the first file, matching jdupes.c's
/// default-to-first-entry behavior when the user just presses Enter.
fn prompt_preserve_set(
    arena: &FileArena,
    group: &[FileId],
    index: usize,
    total: usize,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Vec<usize>> {
    writeln!(output, "Set {} of {}, preserve files [1 - {}, all]:", index + 1, total, group.len()).ok();
    for (n, &id) in group.iter().enumerate() {
        writeln!(output, "  [{}] {}", n + 1, arena.get(id).path.display()).ok();
    }
    write!(output, "> ").ok();
    output.flush().ok();

    let mut line = String::new();
    input.read_line(&mut line).map_err(|e| crate::error::EngineError::from_io("<stdin>", e))?;
    let line = line.trim();

    if line.is_empty() {
        return Ok(vec![0]);
    }
    if line.eq_ignore_ascii_case("all") {
        return Ok((0..group.len()).collect());
    }

    let preserve: Vec<usize> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .filter_map(|tok| tok.parse::<usize>().ok())
        .filter(|&n| n >= 1 && n <= group.len())
        .map(|n| n - 1)
        .collect();

    if preserve.is_empty() {
        Ok(vec![0])
    } else {
        Ok(preserve)
    }
}
