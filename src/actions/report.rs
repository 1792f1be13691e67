//! Plain-text presentation of a finished run: one duplicate group per
//! blank-line-separated block.

use crate::engine::RunReport;
use crate::file::FileArena;

pub fn print_text(arena: &FileArena, report: &RunReport) {
    for group in &report.duplicate_groups {
        for &id in group {
            println!("{}", arena.get(id).path.display());
        }
        println!();
    }
    println!(
        "{} duplicate group(s), {} duplicate file(s), {} byte(s) duplicated",
        report.duplicate_groups.len(),
        report.stats.duplicate_files,
        report.stats.bytes_duplicated,
    );
}
