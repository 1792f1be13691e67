//! Duplicate-file-finder engine: walks a set of paths, groups files with
//! identical content, and hands the groups to a collaborator layer (CLI,
//! JSON output, linking) that decides what to do with them.

mod cancel;
mod change;
mod config;
mod confirm;
mod engine;
mod error;
mod exclude;
mod file;
mod flags;
mod group;
mod hasher;
mod ledger;
mod platform;
mod reflink;
mod stat;
mod tree;
mod walker;

pub mod actions;

pub use crate::cancel::{CancellationToken, RuntimeFlag};
pub use crate::change::{check as check_for_change, ChangeStatus};
pub use crate::config::{Config, OrderBy, Recurse, SortDirection};
pub use crate::engine::{Engine, RootSpec, RunReport, Stats};
pub use crate::error::{EngineError, Result};
pub use crate::exclude::ExcludeRule;
pub use crate::file::{FileArena, FileId, FileRec};
pub use crate::flags::FileFlags;
pub use crate::stat::FileStat;
