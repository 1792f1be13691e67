//! JSON presentation of a finished run (`--json`).

use crate::engine::{RunReport, Stats};
use crate::file::FileArena;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport {
    creator: String,
    groups: Vec<Vec<PathBuf>>,
    stats: Stats,
}

impl JsonReport {
    pub fn new(arena: &FileArena, report: &RunReport) -> Self {
        JsonReport {
            creator: format!("dupe-krill {}", env!("CARGO_PKG_VERSION")),
            groups: report
                .duplicate_groups
                .iter()
                .map(|group| group.iter().map(|&id| arena.get(id).path.clone()).collect())
                .collect(),
            stats: report.stats,
        }
    }

    pub fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(s) => println!("{s}"),
            Err(e) => log::error!("failed to serialize report: {e}"),
        }
    }
}
