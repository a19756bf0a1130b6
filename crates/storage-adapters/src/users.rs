//! Per-user document storage, one JSON file per username.
//!
//! The user directory lives next to the content tree (`{data_dir}/../users`
//! in the default layout) so content operations can never collide with it.

use std::path::PathBuf;

use async_trait::async_trait;
use domains::{Result, UserDoc, UserStore, UserUpdate};

use crate::files::{read_json_opt, write_json, LockTable};
use crate::paths::validate_component;

/// `UserStore` backed by a flat directory of `{username}.json` files.
pub struct FsUserStore {
    root: PathBuf,
    locks: LockTable,
}

impl FsUserStore {
    /// Opens the store, creating the user directory when absent.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(FsUserStore {
            root,
            locks: LockTable::default(),
        })
    }

    fn user_path(&self, username: &str) -> Result<PathBuf> {
        validate_component(username)?;
        Ok(self.root.join(format!("{username}.json")))
    }
}

#[async_trait]
impl UserStore for FsUserStore {
    async fn read_user(&self, username: &str) -> Result<Option<UserDoc>> {
        let path = self.user_path(username)?;
        match read_json_opt::<UserDoc>(&path).await {
            Ok(doc) => Ok(doc),
            Err(_) => {
                tracing::warn!(username, "unreadable user document, treating as absent");
                Ok(None)
            }
        }
    }

    async fn update_user(&self, username: &str, update: UserUpdate) -> Result<UserDoc> {
        let path = self.user_path(username)?;
        let _guard = self.locks.lock_for(&path).lock_owned().await;
        let mut doc = match read_json_opt::<UserDoc>(&path).await {
            Ok(Some(doc)) => doc,
            Ok(None) => UserDoc::default(),
            Err(_) => {
                tracing::warn!(username, "unreadable user document, starting fresh");
                UserDoc::default()
            }
        };
        update(&mut doc)?;
        write_json(&path, &doc).await?;
        Ok(doc)
    }

    async fn list_usernames(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if let Some(username) = name.strip_suffix(".json") {
                names.push(username.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
