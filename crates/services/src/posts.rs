//! Post lifecycle: publishing, editing, moving, pinning.

use std::sync::Arc;

use domains::{
    now_millis, post_filename, ContentStore, Error, HistoryEntry, PermissionLevel, Pin, PinExpiry,
    PinScope, Post, PostLocation, PostRecord, Result, SessionUser,
};

use crate::permissions::PermissionService;

pub struct PostService {
    content: Arc<dyn ContentStore>,
    permissions: Arc<PermissionService>,
}

impl PostService {
    pub fn new(content: Arc<dyn ContentStore>, permissions: Arc<PermissionService>) -> Self {
        PostService { content, permissions }
    }

    /// Posts of one section, oldest filename first. A missing directory
    /// reads as empty.
    pub async fn list(&self, board: &str, section: &str) -> Result<Vec<PostRecord>> {
        self.content.list_posts(board, section).await
    }

    /// Every post on the site.
    pub async fn all(&self) -> Result<Vec<PostRecord>> {
        self.content.list_all_posts().await
    }

    /// Publishes a post and returns its filename.
    ///
    /// Mute and blacklist apply only on claimed boards; an unclaimed board
    /// has no metadata to restrict anyone. Nothing is written when a check
    /// fails.
    pub async fn create(
        &self,
        user: &SessionUser,
        board: &str,
        section: &str,
        title: String,
        content: String,
        tags: Vec<String>,
    ) -> Result<String> {
        if let Some(meta) = self.content.read_meta(board).await? {
            if meta.is_muted(section) {
                return Err(Error::Forbidden(
                    "this board or section is currently muted".into(),
                ));
            }
            if meta.is_blacklisted(section, &user.username) {
                return Err(Error::Forbidden(
                    "you are blacklisted from this board".into(),
                ));
            }
        }

        let post = Post::publish(user, title, content, tags);
        let filename = post_filename(post.time);
        let loc = PostLocation::new(board, section, filename.clone());
        self.content.write_post(&loc, &post).await?;
        tracing::info!(%loc, author = %user.username, "post published");
        Ok(filename)
    }

    /// Rewrites title and content, keeping the pre-edit values in history.
    /// Allowed for the author and for anyone at section-admin level or
    /// above.
    pub async fn edit(
        &self,
        user: &SessionUser,
        loc: &PostLocation,
        title: String,
        content: String,
    ) -> Result<()> {
        let level = self
            .permissions
            .resolve(&user.username, Some(&loc.board), Some(&loc.section))
            .await?;
        let username = user.username.clone();
        self.content
            .update_post(
                loc,
                Box::new(move |post| {
                    if post.author != username && level < PermissionLevel::SectionAdmin {
                        return Err(Error::Forbidden("insufficient permissions".into()));
                    }
                    let old_title = std::mem::replace(&mut post.title, title);
                    let old_content = std::mem::replace(&mut post.content, content);
                    post.history.push(HistoryEntry::Edit {
                        user: username,
                        time: now_millis(),
                        old_title,
                        old_content,
                    });
                    Ok(())
                }),
            )
            .await?;
        Ok(())
    }

    /// Relocates a post into another section, appending a move record with
    /// both endpoints. The permission check runs against the source.
    pub async fn move_post(
        &self,
        user: &SessionUser,
        from: &PostLocation,
        to_board: &str,
        to_section: &str,
    ) -> Result<()> {
        let level = self
            .permissions
            .resolve(&user.username, Some(&from.board), Some(&from.section))
            .await?;
        let username = user.username.clone();
        let from_label = format!("{}/{}", from.board, from.section);
        let to_label = format!("{}/{}", to_board, to_section);
        self.content
            .move_post(
                from,
                to_board,
                to_section,
                Box::new(move |post| {
                    if post.author != username && level < PermissionLevel::SectionAdmin {
                        return Err(Error::Forbidden("insufficient permissions".into()));
                    }
                    post.history.push(HistoryEntry::Move {
                        user: username,
                        time: now_millis(),
                        from: from_label,
                        to: to_label,
                    });
                    Ok(())
                }),
            )
            .await?;
        tracing::info!(%from, to_board, to_section, "post moved");
        Ok(())
    }

    /// Pins a post at the given scope. `duration_hours` of `-1` pins
    /// forever; anything else expires that many hours from now.
    ///
    /// Scope thresholds: `today` needs a super admin, `board` a board
    /// admin, `section` a section admin.
    pub async fn pin(
        &self,
        user: &SessionUser,
        loc: &PostLocation,
        scope: PinScope,
        duration_hours: i64,
    ) -> Result<()> {
        let required = match scope {
            PinScope::Today => PermissionLevel::Super,
            PinScope::Board => PermissionLevel::BoardAdmin,
            PinScope::Section => PermissionLevel::SectionAdmin,
        };
        let level = self
            .permissions
            .resolve(&user.username, Some(&loc.board), Some(&loc.section))
            .await?;
        if level < required {
            return Err(Error::Forbidden(
                "insufficient permissions to pin at this level".into(),
            ));
        }

        let now = now_millis();
        let expire_at = if duration_hours == -1 {
            PinExpiry::Never
        } else {
            // Client-supplied; checked math so an absurd duration cannot wrap.
            let at = duration_hours
                .checked_mul(3_600_000)
                .and_then(|ms| now.timestamp_millis().checked_add(ms))
                .ok_or_else(|| Error::Invalid("pin duration out of range".into()))?;
            PinExpiry::At(at)
        };
        let username = user.username.clone();
        self.content
            .update_post(
                loc,
                Box::new(move |post| {
                    post.pinned = Some(Pin { level: scope, expire_at });
                    post.history.push(HistoryEntry::Pin {
                        user: username,
                        time: now,
                        level: scope,
                    });
                    Ok(())
                }),
            )
            .await?;
        Ok(())
    }

    /// Records that a user shared the post. History only; the stored
    /// `shares` counter never moves.
    pub async fn share_record(&self, user: &SessionUser, loc: &PostLocation) -> Result<()> {
        let username = user.username.clone();
        self.content
            .update_post(
                loc,
                Box::new(move |post| {
                    post.history.push(HistoryEntry::Share {
                        user: username,
                        time: now_millis(),
                    });
                    Ok(())
                }),
            )
            .await?;
        Ok(())
    }
}
