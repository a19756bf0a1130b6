//! The social mutators: like, vote, comment, follow, settings.
//!
//! Each operation is one read-modify-write cycle on a single document. The
//! adapters serialize cycles per file, so two concurrent likes cannot lose
//! each other, but nothing here spans more than one file.

use std::sync::Arc;

use domains::{
    now_millis, Comment, ContentStore, Error, Following, HistoryEntry, PostLocation, Result,
    SessionUser, UserStore,
};
use serde::Deserialize;
use serde_json::Value;

/// What a follow toggle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowKind {
    /// A board name.
    Board,
    /// A `board/section` composite string.
    Section,
}

pub struct SocialService {
    content: Arc<dyn ContentStore>,
    users: Arc<dyn UserStore>,
}

impl SocialService {
    pub fn new(content: Arc<dyn ContentStore>, users: Arc<dyn UserStore>) -> Self {
        SocialService { content, users }
    }

    /// Toggles the caller's like on a post. Returns the new membership state
    /// and the resulting like count. Only the liking edge leaves a history
    /// entry; taking a like back is silent.
    pub async fn like(&self, user: &SessionUser, loc: &PostLocation) -> Result<(bool, usize)> {
        let username = user.username.clone();
        let post = self
            .content
            .update_post(
                loc,
                Box::new(move |post| {
                    if let Some(pos) = post.likes.iter().position(|u| u == &username) {
                        post.likes.remove(pos);
                    } else {
                        post.likes.push(username.clone());
                        post.history.push(HistoryEntry::Like {
                            user: username,
                            time: now_millis(),
                        });
                    }
                    Ok(())
                }),
            )
            .await?;
        let liked = post.likes.iter().any(|u| u == &user.username);
        Ok((liked, post.likes.len()))
    }

    /// Registers a single-choice vote. A user who has voted on any option of
    /// the post is refused; there is no switching.
    pub async fn vote(
        &self,
        user: &SessionUser,
        loc: &PostLocation,
        option: &str,
    ) -> Result<std::collections::BTreeMap<String, Vec<String>>> {
        if option.is_empty() {
            return Err(Error::Invalid("missing vote option".into()));
        }
        let username = user.username.clone();
        let option = option.to_string();
        let post = self
            .content
            .update_post(
                loc,
                Box::new(move |post| {
                    if post.has_voted(&username) {
                        return Err(Error::Invalid("you have already voted on this post".into()));
                    }
                    post.votes.entry(option.clone()).or_default().push(username.clone());
                    post.history.push(HistoryEntry::Vote {
                        user: username,
                        time: now_millis(),
                        option,
                    });
                    Ok(())
                }),
            )
            .await?;
        Ok(post.votes)
    }

    /// Appends a comment. Comments cannot be edited or removed and leave no
    /// history entry on the post.
    pub async fn comment(&self, user: &SessionUser, loc: &PostLocation, content: String) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::Invalid("empty comment".into()));
        }
        let comment = Comment {
            author: user.username.clone(),
            author_avatar: user.avatar.clone(),
            content,
            time: now_millis(),
        };
        self.content
            .update_post(
                loc,
                Box::new(move |post| {
                    post.comments.push(comment);
                    Ok(())
                }),
            )
            .await?;
        Ok(())
    }

    /// Toggles a follow marker and reports whether the user now follows the
    /// target. The user document appears on the first follow.
    pub async fn follow(
        &self,
        user: &SessionUser,
        kind: FollowKind,
        target: &str,
    ) -> Result<bool> {
        if target.is_empty() {
            return Err(Error::Invalid("missing follow target".into()));
        }
        let target = target.to_string();
        let probe = target.clone();
        let doc = self
            .users
            .update_user(
                &user.username,
                Box::new(move |doc| {
                    let list = match kind {
                        FollowKind::Board => &mut doc.following.boards,
                        FollowKind::Section => &mut doc.following.sections,
                    };
                    if let Some(pos) = list.iter().position(|t| t == &target) {
                        list.remove(pos);
                    } else {
                        list.push(target);
                    }
                    Ok(())
                }),
            )
            .await?;
        let list = match kind {
            FollowKind::Board => &doc.following.boards,
            FollowKind::Section => &doc.following.sections,
        };
        Ok(list.iter().any(|t| t == &probe))
    }

    /// The user's follow lists; a user without a document follows nothing.
    pub async fn follows(&self, username: &str) -> Result<Following> {
        Ok(self
            .users
            .read_user(username)
            .await?
            .map(|doc| doc.following)
            .unwrap_or_default())
    }

    /// Replaces the user's free-form settings blob.
    pub async fn save_settings(&self, user: &SessionUser, settings: Value) -> Result<()> {
        self.users
            .update_user(
                &user.username,
                Box::new(move |doc| {
                    doc.settings = Some(settings);
                    Ok(())
                }),
            )
            .await?;
        Ok(())
    }
}
