//! Board, section and post storage on the local file system.
//!
//! Layout under the data root:
//!
//! ```text
//! {root}/{board}/owner.json                  board metadata
//! {root}/{board}/{section}/{filename}.json   one file per post
//! {root}/daily_summary.json                  written by an external job
//! {root}/boards_order.json                   site-wide board ordering
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domains::{
    BoardMeta, ContentStore, Error, MetaUpdate, Post, PostLocation, PostRecord, PostUpdate, Result,
};
use serde_json::Value;

use crate::files::{read_json_opt, write_json, LockTable};
use crate::paths::validate_component;

const META_FILE: &str = "owner.json";
const SUMMARY_FILE: &str = "daily_summary.json";
const BOARDS_ORDER_FILE: &str = "boards_order.json";

/// `ContentStore` backed by a directory tree rooted at `root`.
pub struct FsContentStore {
    root: PathBuf,
    locks: LockTable,
}

impl FsContentStore {
    /// Opens the store, creating the data root when absent.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(FsContentStore {
            root,
            locks: LockTable::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn board_dir(&self, board: &str) -> Result<PathBuf> {
        validate_component(board)?;
        Ok(self.root.join(board))
    }

    fn meta_path(&self, board: &str) -> Result<PathBuf> {
        Ok(self.board_dir(board)?.join(META_FILE))
    }

    fn section_dir(&self, board: &str, section: &str) -> Result<PathBuf> {
        validate_component(section)?;
        Ok(self.board_dir(board)?.join(section))
    }

    fn post_path(&self, loc: &PostLocation) -> Result<PathBuf> {
        validate_component(&loc.filename)?;
        Ok(self.section_dir(&loc.board, &loc.section)?.join(&loc.filename))
    }

    /// Subdirectory names of `path`, sorted. Plain files are not boards or
    /// sections and stay invisible here.
    async fn dir_names(path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read_meta_at(path: &Path) -> Result<Option<BoardMeta>> {
        match read_json_opt::<BoardMeta>(path).await {
            Ok(meta) => Ok(meta),
            Err(_) => {
                tracing::warn!(path = %path.display(), "unreadable board metadata, treating as absent");
                Ok(None)
            }
        }
    }

    /// Post records of one section, sorted by filename (which sorts by
    /// publish time for server-generated names). Missing directory reads as
    /// empty; files that fail to parse are skipped with a warning.
    async fn posts_in(&self, board: &str, section: &str) -> Result<Vec<PostRecord>> {
        let dir = self.section_dir(board, section)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !name.ends_with(".json") || name == META_FILE {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match read_json_opt::<Post>(&entry.path()).await {
                Ok(Some(post)) => records.push(PostRecord {
                    board: board.to_string(),
                    section: section.to_string(),
                    filename: name,
                    post,
                }),
                Ok(None) => {}
                Err(_) => {
                    tracing::warn!(board, section, file = %name, "skipping unreadable post file");
                }
            }
        }
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(records)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn list_boards(&self) -> Result<Vec<String>> {
        Self::dir_names(&self.root).await
    }

    async fn board_exists(&self, board: &str) -> Result<bool> {
        let dir = self.board_dir(board)?;
        Ok(tokio::fs::try_exists(&dir).await?)
    }

    async fn create_board(&self, board: &str, owner: &str) -> Result<()> {
        let dir = self.board_dir(board)?;
        if tokio::fs::try_exists(&dir).await? {
            return Err(Error::Invalid("board already exists".into()));
        }
        tokio::fs::create_dir_all(&dir).await?;
        write_json(&dir.join(META_FILE), &BoardMeta::new(owner)).await
    }

    async fn rename_board(&self, board: &str, new_name: &str) -> Result<()> {
        let old = self.board_dir(board)?;
        let new = self.board_dir(new_name)?;
        if tokio::fs::try_exists(&new).await? {
            return Err(Error::Invalid("new name already exists".into()));
        }
        if !tokio::fs::try_exists(&old).await? {
            return Err(Error::NotFound("board".into()));
        }
        tokio::fs::rename(&old, &new).await?;
        Ok(())
    }

    async fn delete_board(&self, board: &str) -> Result<()> {
        let dir = self.board_dir(board)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Err(Error::NotFound("board".into()));
        }
        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }

    async fn read_meta(&self, board: &str) -> Result<Option<BoardMeta>> {
        let path = self.meta_path(board)?;
        Self::read_meta_at(&path).await
    }

    async fn update_meta(&self, board: &str, update: MetaUpdate) -> Result<BoardMeta> {
        let path = self.meta_path(board)?;
        let _guard = self.locks.lock_for(&path).lock_owned().await;
        let mut meta = Self::read_meta_at(&path)
            .await?
            .ok_or_else(|| Error::NotFound("board metadata".into()))?;
        update(&mut meta)?;
        write_json(&path, &meta).await?;
        Ok(meta)
    }

    async fn list_sections(&self, board: &str) -> Result<Vec<String>> {
        let dir = self.board_dir(board)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Err(Error::NotFound("board".into()));
        }
        Self::dir_names(&dir).await
    }

    async fn section_exists(&self, board: &str, section: &str) -> Result<bool> {
        let dir = self.section_dir(board, section)?;
        Ok(tokio::fs::try_exists(&dir).await?)
    }

    async fn create_section(&self, board: &str, section: &str) -> Result<()> {
        let dir = self.section_dir(board, section)?;
        if tokio::fs::try_exists(&dir).await? {
            return Err(Error::Invalid("section already exists".into()));
        }
        tokio::fs::create_dir_all(&dir).await?;
        Ok(())
    }

    async fn rename_section(&self, board: &str, section: &str, new_name: &str) -> Result<bool> {
        let old = self.section_dir(board, section)?;
        let new = self.section_dir(board, new_name)?;
        if !tokio::fs::try_exists(&old).await? {
            return Ok(false);
        }
        tokio::fs::rename(&old, &new).await?;
        Ok(true)
    }

    async fn delete_section(&self, board: &str, section: &str) -> Result<()> {
        let dir = self.section_dir(board, section)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Err(Error::NotFound("section".into()));
        }
        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }

    async fn list_posts(&self, board: &str, section: &str) -> Result<Vec<PostRecord>> {
        self.posts_in(board, section).await
    }

    async fn list_all_posts(&self) -> Result<Vec<PostRecord>> {
        let mut records = Vec::new();
        for board in Self::dir_names(&self.root).await? {
            for section in Self::dir_names(&self.root.join(&board)).await? {
                records.extend(self.posts_in(&board, &section).await?);
            }
        }
        Ok(records)
    }

    async fn read_post(&self, loc: &PostLocation) -> Result<Post> {
        let path = self.post_path(loc)?;
        match read_json_opt::<Post>(&path).await {
            Ok(Some(post)) => Ok(post),
            Ok(None) => Err(Error::NotFound("post".into())),
            Err(_) => {
                tracing::warn!(location = %loc, "unreadable post file");
                Err(Error::NotFound("post".into()))
            }
        }
    }

    async fn write_post(&self, loc: &PostLocation, post: &Post) -> Result<()> {
        let path = self.post_path(loc)?;
        let dir = self.section_dir(&loc.board, &loc.section)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Err(Error::Invalid("section does not exist".into()));
        }
        write_json(&path, post).await
    }

    async fn update_post(&self, loc: &PostLocation, update: PostUpdate) -> Result<Post> {
        let path = self.post_path(loc)?;
        let _guard = self.locks.lock_for(&path).lock_owned().await;
        let mut post = match read_json_opt::<Post>(&path).await {
            Ok(Some(post)) => post,
            Ok(None) => return Err(Error::NotFound("post".into())),
            Err(_) => {
                tracing::warn!(location = %loc, "unreadable post file");
                return Err(Error::NotFound("post".into()));
            }
        };
        update(&mut post)?;
        write_json(&path, &post).await?;
        Ok(post)
    }

    async fn delete_post(&self, loc: &PostLocation) -> Result<()> {
        let path = self.post_path(loc)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn move_post(
        &self,
        from: &PostLocation,
        to_board: &str,
        to_section: &str,
        update: PostUpdate,
    ) -> Result<()> {
        let from_path = self.post_path(from)?;
        let to_dir = self.section_dir(to_board, to_section)?;
        let to_path = to_dir.join(&from.filename);

        // Both documents stay locked for the whole move; sorted acquisition
        // keeps concurrent moves deadlock-free.
        let (first, second) = if from_path <= to_path {
            (&from_path, &to_path)
        } else {
            (&to_path, &from_path)
        };
        let _first = self.locks.lock_for(first).lock_owned().await;
        let _second = if second != first {
            Some(self.locks.lock_for(second).lock_owned().await)
        } else {
            None
        };

        if !tokio::fs::try_exists(&from_path).await? {
            return Err(Error::NotFound("post".into()));
        }
        if !tokio::fs::try_exists(&to_dir).await? {
            return Err(Error::NotFound("target section".into()));
        }

        let mut post = match read_json_opt::<Post>(&from_path).await {
            Ok(Some(post)) => post,
            _ => return Err(Error::NotFound("post".into())),
        };
        update(&mut post)?;
        write_json(&to_path, &post).await?;
        if to_path != from_path {
            tokio::fs::remove_file(&from_path).await?;
        }
        Ok(())
    }

    async fn read_summary(&self) -> Result<Option<Value>> {
        match read_json_opt::<Value>(&self.root.join(SUMMARY_FILE)).await {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!("unreadable daily summary file, serving none");
                Ok(None)
            }
        }
    }

    async fn write_boards_order(&self, order: &[String]) -> Result<()> {
        write_json(&self.root.join(BOARDS_ORDER_FILE), order).await
    }
}
