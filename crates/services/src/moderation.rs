//! Board management: the `manage/update` action dispatch and site-wide
//! board ordering.
//!
//! The entry gate here is role-exact, not a threshold: the board owner and
//! the admins of the named section get in, board admins and super admins do
//! not, matching how the management surface has always behaved. Threshold
//! checks stay in [`crate::permissions::PermissionService`].

use std::sync::Arc;

use domains::{ContentStore, Error, Result, SessionUser};
use serde_json::{Map, Value};

use crate::permissions::PermissionService;

pub struct ModerationService {
    content: Arc<dyn ContentStore>,
    permissions: Arc<PermissionService>,
}

impl ModerationService {
    pub fn new(content: Arc<dyn ContentStore>, permissions: Arc<PermissionService>) -> Self {
        ModerationService { content, permissions }
    }

    /// Dispatches one management action against a board.
    ///
    /// Actions that mutate metadata return the updated document;
    /// `deletePost` returns nothing. Multi-step actions (section rename,
    /// section delete) touch the directory tree first and the metadata
    /// second, with no rollback in between.
    pub async fn manage_update(
        &self,
        user: &SessionUser,
        board: &str,
        section: Option<&str>,
        action: &str,
        data: &Value,
    ) -> Result<Option<Value>> {
        let meta = self
            .content
            .read_meta(board)
            .await?
            .ok_or_else(|| Error::NotFound("board metadata".into()))?;

        let is_owner = meta.owner == user.username;
        let runs_named_section = section
            .map(|s| meta.is_section_admin(s, &user.username))
            .unwrap_or(false);
        if !is_owner && !runs_named_section {
            return Err(Error::Forbidden(
                "only the board owner or an admin of this section can manage it".into(),
            ));
        }

        let require_owner = |what: &str| -> Result<()> {
            if is_owner {
                Ok(())
            } else {
                Err(Error::Forbidden(format!("only the board owner can {what}")))
            }
        };

        let meta = match action {
            // Board-level mute needs the owner; a section admin may mute the
            // section they run.
            "setMuted" => {
                let muted = data
                    .get("muted")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| Error::Invalid("missing muted flag".into()))?;
                match section {
                    Some(section) => {
                        let section = section.to_string();
                        self.content
                            .update_meta(
                                board,
                                Box::new(move |meta| {
                                    meta.section_settings.entry(section).or_default().muted = muted;
                                    Ok(())
                                }),
                            )
                            .await?
                    }
                    None => {
                        require_owner("mute the board")?;
                        self.content
                            .update_meta(
                                board,
                                Box::new(move |meta| {
                                    meta.muted = muted;
                                    Ok(())
                                }),
                            )
                            .await?
                    }
                }
            }

            // Same split as setMuted: no section means the board blacklist.
            // Incremental: `data` names one user and whether to add them.
            "updateBlacklist" => {
                let target = data
                    .get("user")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::Invalid("missing user".into()))?
                    .to_string();
                let add = data.get("type").and_then(Value::as_str) == Some("add");
                let section = section.map(str::to_string);
                self.content
                    .update_meta(
                        board,
                        Box::new(move |meta| {
                            let list = match section {
                                Some(section) => {
                                    &mut meta.section_settings.entry(section).or_default().blacklist
                                }
                                None => &mut meta.blacklist,
                            };
                            if add {
                                if !list.contains(&target) {
                                    list.push(target);
                                }
                            } else {
                                list.retain(|u| u != &target);
                            }
                            Ok(())
                        }),
                    )
                    .await?
            }

            // Incremental roster edit for the named section's admins.
            "manageSecAdmin" => {
                require_owner("assign section admins")?;
                let target = section
                    .ok_or_else(|| Error::Invalid("missing section".into()))?
                    .to_string();
                let admin = data
                    .get("user")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::Invalid("missing user".into()))?
                    .to_string();
                let add = data.get("type").and_then(Value::as_str) == Some("add");
                self.content
                    .update_meta(
                        board,
                        Box::new(move |meta| {
                            let roster = meta.section_admins.entry(target).or_default();
                            if add {
                                if !roster.contains(&admin) {
                                    roster.push(admin);
                                }
                            } else {
                                roster.retain(|u| u != &admin);
                            }
                            Ok(())
                        }),
                    )
                    .await?
            }

            "sectionConfig" => {
                require_owner("configure sections")?;
                let section = section
                    .ok_or_else(|| Error::Invalid("missing section".into()))?
                    .to_string();
                let patch = data
                    .as_object()
                    .cloned()
                    .ok_or_else(|| Error::Invalid("config must be an object".into()))?;
                self.apply_section_config(board, section, patch).await?
            }

            // The doomed section is named in the payload, not the top-level
            // section field (which may carry the caller's own section).
            "deleteSection" => {
                require_owner("delete sections")?;
                let target = data
                    .get("sectionName")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::Invalid("missing sectionName".into()))?
                    .to_string();
                self.content.delete_section(board, &target).await?;
                self.content
                    .update_meta(
                        board,
                        Box::new(move |meta| {
                            meta.sections_order.retain(|s| s != &target);
                            meta.section_admins.remove(&target);
                            meta.section_settings.remove(&target);
                            Ok(())
                        }),
                    )
                    .await?
            }

            "deletePost" => {
                let section = section.ok_or_else(|| Error::Invalid("missing section".into()))?;
                let filename = data
                    .get("filename")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::Invalid("missing filename".into()))?;
                let loc = domains::PostLocation::new(board, section, filename);
                self.content.delete_post(&loc).await?;
                tracing::info!(%loc, by = %user.username, "post removed by moderation");
                return Ok(None);
            }

            "reorderSections" => {
                require_owner("reorder sections")?;
                let order: Vec<String> = data
                    .get("newOrder")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .ok_or_else(|| Error::Invalid("missing newOrder".into()))?;
                self.content
                    .update_meta(
                        board,
                        Box::new(move |meta| {
                            meta.sections_order = order;
                            Ok(())
                        }),
                    )
                    .await?
            }

            other => {
                return Err(Error::Invalid(format!("unknown manage action: {other}")));
            }
        };

        Ok(Some(serde_json::to_value(meta)?))
    }

    /// Merges a free-form config patch into a section's settings. A
    /// `newName` key additionally renames the section directory and
    /// migrates every metadata key pointing at the old name.
    async fn apply_section_config(
        &self,
        board: &str,
        section: String,
        mut patch: Map<String, Value>,
    ) -> Result<domains::BoardMeta> {
        let new_name = match patch.remove("newName") {
            Some(Value::String(name)) if name != section => Some(name),
            _ => None,
        };

        if let Some(new_name) = &new_name {
            // A missing source directory reads as false; the metadata keys
            // migrate either way.
            self.content.rename_section(board, &section, new_name).await?;
        }

        self.content
            .update_meta(
                board,
                Box::new(move |meta| {
                    let key = match new_name {
                        Some(new_name) => {
                            if let Some(settings) = meta.section_settings.remove(&section) {
                                meta.section_settings.insert(new_name.clone(), settings);
                            }
                            if let Some(admins) = meta.section_admins.remove(&section) {
                                meta.section_admins.insert(new_name.clone(), admins);
                            }
                            for entry in meta.sections_order.iter_mut() {
                                if *entry == section {
                                    *entry = new_name.clone();
                                }
                            }
                            new_name
                        }
                        None => section,
                    };
                    meta.section_settings.entry(key).or_default().merge(&patch);
                    Ok(())
                }),
            )
            .await
    }

    /// Persists the site-wide board ordering. Super admins only. The file is
    /// written for external consumers; the server itself keeps listing
    /// boards lexicographically.
    pub async fn reorder_boards(&self, user: &SessionUser, order: &[String]) -> Result<()> {
        if !self.permissions.is_super(&user.username) {
            return Err(Error::Forbidden("super admin only".into()));
        }
        self.content.write_boards_order(order).await
    }
}
