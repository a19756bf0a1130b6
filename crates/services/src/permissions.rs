//! The ordered permission resolver.
//!
//! Exactly one code path decides what a user may do on a board or section.
//! Every threshold gate ("at least board admin") goes through [`PermissionService::resolve`];
//! the handful of role-exact gates (board owner, a section's admin roster)
//! read the metadata document directly and are deliberately not expressed
//! as thresholds.

use std::collections::HashSet;
use std::sync::Arc;

use domains::{ContentStore, PermissionLevel, Result};
use serde::Serialize;

/// Resolves permission levels and aggregates a user's grants.
pub struct PermissionService {
    content: Arc<dyn ContentStore>,
    super_admins: HashSet<String>,
}

/// Everything a user may administer, for the management UI.
#[derive(Debug, Serialize)]
pub struct PermissionGrants {
    #[serde(rename = "isSuperAdmin")]
    pub is_super_admin: bool,
    #[serde(rename = "ownedBoards")]
    pub owned_boards: Vec<String>,
    #[serde(rename = "adminBoards")]
    pub admin_boards: Vec<String>,
    #[serde(rename = "sectionAdmins")]
    pub section_admins: Vec<SectionGrant>,
}

#[derive(Debug, Serialize)]
pub struct SectionGrant {
    pub board: String,
    pub section: String,
}

impl PermissionService {
    pub fn new(
        content: Arc<dyn ContentStore>,
        super_admins: impl IntoIterator<Item = String>,
    ) -> Self {
        PermissionService {
            content,
            super_admins: super_admins.into_iter().collect(),
        }
    }

    pub fn is_super(&self, username: &str) -> bool {
        self.super_admins.contains(username)
    }

    /// Resolves the caller's level for a board/section context.
    ///
    /// Rungs, first match wins: configured super admins; no board context
    /// (site-level action) reads as plain poster; a board without readable
    /// metadata grants nothing above poster; owner; board admin; admin of
    /// the named section; poster.
    pub async fn resolve(
        &self,
        username: &str,
        board: Option<&str>,
        section: Option<&str>,
    ) -> Result<PermissionLevel> {
        if self.is_super(username) {
            return Ok(PermissionLevel::Super);
        }
        let Some(board) = board else {
            return Ok(PermissionLevel::Poster);
        };
        let Some(meta) = self.content.read_meta(board).await? else {
            return Ok(PermissionLevel::Poster);
        };
        if meta.owner == username {
            return Ok(PermissionLevel::BoardOwner);
        }
        if meta.is_admin(username) {
            return Ok(PermissionLevel::BoardAdmin);
        }
        if let Some(section) = section {
            if meta.is_section_admin(section, username) {
                return Ok(PermissionLevel::SectionAdmin);
            }
        }
        Ok(PermissionLevel::Poster)
    }

    /// Collects every board the user owns or administers and every section
    /// roster they sit on.
    pub async fn grants(&self, username: &str) -> Result<PermissionGrants> {
        let mut grants = PermissionGrants {
            is_super_admin: self.is_super(username),
            owned_boards: Vec::new(),
            admin_boards: Vec::new(),
            section_admins: Vec::new(),
        };

        for board in self.content.list_boards().await? {
            let Some(meta) = self.content.read_meta(&board).await? else {
                continue;
            };
            if meta.owner == username {
                grants.owned_boards.push(board.clone());
            }
            if meta.is_admin(username) {
                grants.admin_boards.push(board.clone());
            }
            for (section, admins) in &meta.section_admins {
                if admins.iter().any(|u| u == username) {
                    grants.section_admins.push(SectionGrant {
                        board: board.clone(),
                        section: section.clone(),
                    });
                }
            }
        }
        Ok(grants)
    }
}
