//! Collaborators that consume a finished [`crate::RunReport`] and decide
//! what to do with it: print it, or replace duplicates with links. These
//! live outside the engine's core pipeline and talk to it only through
//! its public types.

pub mod delete;
pub mod link;
pub mod report;

#[cfg(feature = "json")]
pub mod json;

pub use delete::{delete_duplicates, DeleteMode, DeleteStats};
pub use link::{apply_links, LinkMode, LinkStats};
