//! # storage-adapters
//!
//! File-system implementations of the `domains` storage ports. The data
//! directory itself is the database: one directory per board, one directory
//! per section, one JSON file per post, plus `owner.json` per board and a
//! handful of site-level files next to the boards.

mod files;
mod paths;

pub mod content;
pub mod users;

pub use content::FsContentStore;
pub use users::FsUserStore;
