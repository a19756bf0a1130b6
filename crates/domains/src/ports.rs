//! # Ports
//!
//! Storage contracts the service layer depends on. Adapter crates implement
//! these; the `testing` feature exposes mockall mocks to consumers.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{BoardMeta, Post, PostLocation, PostRecord, UserDoc};

/// Mutation applied to a board metadata document under its file lock.
pub type MetaUpdate = Box<dyn FnOnce(&mut BoardMeta) -> Result<()> + Send>;
/// Mutation applied to a post document under its file lock.
pub type PostUpdate = Box<dyn FnOnce(&mut Post) -> Result<()> + Send>;
/// Mutation applied to a user document under its file lock.
pub type UserUpdate = Box<dyn FnOnce(&mut UserDoc) -> Result<()> + Send>;

/// The content tree: boards, their sections, their posts, and the
/// site-level documents next to them.
///
/// Implementations own path construction and reject any name that could
/// escape the tree. Update methods apply the closure to the current
/// document and persist the result only when the closure succeeds; a
/// failing closure leaves the file untouched.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    // Boards
    /// Board directory names, sorted.
    async fn list_boards(&self) -> Result<Vec<String>>;
    async fn board_exists(&self, board: &str) -> Result<bool>;
    /// Creates the board directory with its minimal metadata document.
    /// `Invalid` when the board already exists.
    async fn create_board(&self, board: &str, owner: &str) -> Result<()>;
    /// `Invalid` when the target exists, `NotFound` when the source is
    /// missing.
    async fn rename_board(&self, board: &str, new_name: &str) -> Result<()>;
    /// Recursive. `NotFound` when the board is missing.
    async fn delete_board(&self, board: &str) -> Result<()>;

    // Board metadata
    /// Missing and unreadable metadata both read as `None`.
    async fn read_meta(&self, board: &str) -> Result<Option<BoardMeta>>;
    /// Applies `update` and returns the stored document. `NotFound` when the
    /// board has no metadata document.
    async fn update_meta(&self, board: &str, update: MetaUpdate) -> Result<BoardMeta>;

    // Sections
    /// Section directory names, sorted. `NotFound` when the board is missing.
    async fn list_sections(&self, board: &str) -> Result<Vec<String>>;
    async fn section_exists(&self, board: &str, section: &str) -> Result<bool>;
    /// `Invalid` when the section already exists.
    async fn create_section(&self, board: &str, section: &str) -> Result<()>;
    /// Renames the section directory. Returns `false` without error when the
    /// source directory does not exist.
    async fn rename_section(&self, board: &str, section: &str, new_name: &str) -> Result<bool>;
    /// Recursive. `NotFound` when the section is missing.
    async fn delete_section(&self, board: &str, section: &str) -> Result<()>;

    // Posts
    /// Posts of one section. A missing section directory reads as empty;
    /// files that fail to parse are skipped.
    async fn list_posts(&self, board: &str, section: &str) -> Result<Vec<PostRecord>>;
    /// Every post of every board, same skip rules as `list_posts`.
    async fn list_all_posts(&self) -> Result<Vec<PostRecord>>;
    /// `NotFound` when the file is missing or unreadable.
    async fn read_post(&self, loc: &PostLocation) -> Result<Post>;
    /// `Invalid` when the section directory does not exist.
    async fn write_post(&self, loc: &PostLocation, post: &Post) -> Result<()>;
    /// Applies `update` and returns the stored document.
    async fn update_post(&self, loc: &PostLocation, update: PostUpdate) -> Result<Post>;
    /// Deleting an absent file is not an error.
    async fn delete_post(&self, loc: &PostLocation) -> Result<()>;
    /// Applies `update`, writes the document at the destination (same
    /// filename) and removes the source. `NotFound` for a missing source
    /// post or a missing destination section.
    async fn move_post(&self, from: &PostLocation, to_board: &str, to_section: &str, update: PostUpdate) -> Result<()>;

    // Site-level documents
    /// `daily_summary.json`, written by an external job. Missing or
    /// unreadable reads as `None`.
    async fn read_summary(&self) -> Result<Option<Value>>;
    /// Persists the site-wide board ordering.
    async fn write_boards_order(&self, order: &[String]) -> Result<()>;
}

/// Per-user documents stored outside the content tree.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn read_user(&self, username: &str) -> Result<Option<UserDoc>>;
    /// Applies `update` and returns the stored document, starting from a
    /// default document when the user has never been written.
    async fn update_user(&self, username: &str, update: UserUpdate) -> Result<UserDoc>;
    /// Usernames with a stored document, sorted.
    async fn list_usernames(&self) -> Result<Vec<String>>;
}
