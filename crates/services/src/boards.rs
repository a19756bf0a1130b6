//! Board and section lifecycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use domains::{ContentStore, Error, PermissionLevel, Result, SessionUser};
use serde_json::{json, Value};

use crate::permissions::PermissionService;

/// Creates boards and sections and answers structural queries.
pub struct BoardService {
    content: Arc<dyn ContentStore>,
    permissions: Arc<PermissionService>,
}

impl BoardService {
    pub fn new(content: Arc<dyn ContentStore>, permissions: Arc<PermissionService>) -> Self {
        BoardService { content, permissions }
    }

    /// The full board map: every board with its sections in display order.
    ///
    /// Sections named in the board's `sectionsOrder` come first, in list
    /// order; the rest follow lexicographically.
    pub async fn structure(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut structure = BTreeMap::new();
        for board in self.content.list_boards().await? {
            let sections = self.content.list_sections(&board).await?;
            let order = self
                .content
                .read_meta(&board)
                .await?
                .map(|meta| meta.sections_order)
                .unwrap_or_default();
            structure.insert(board, apply_section_order(sections, &order));
        }
        Ok(structure)
    }

    /// Any authenticated user may claim a new board; the caller becomes its
    /// owner.
    pub async fn create_board(&self, user: &SessionUser, name: &str) -> Result<()> {
        self.content.create_board(name, &user.username).await?;
        tracing::info!(board = name, owner = %user.username, "board created");
        Ok(())
    }

    pub async fn rename_board(&self, user: &SessionUser, board: &str, new_name: &str) -> Result<()> {
        if !self.permissions.is_super(&user.username) {
            return Err(Error::Forbidden("super admin only".into()));
        }
        self.content.rename_board(board, new_name).await
    }

    pub async fn delete_board(&self, user: &SessionUser, board: &str) -> Result<()> {
        if !self.permissions.is_super(&user.username) {
            return Err(Error::Forbidden("super admin only".into()));
        }
        self.content.delete_board(board).await?;
        tracing::info!(board, deleted_by = %user.username, "board deleted");
        Ok(())
    }

    /// Adds or removes a board admin. Owner only; this is a role-exact gate,
    /// so even super admins are turned away. Returns the updated roster.
    pub async fn set_admin(
        &self,
        user: &SessionUser,
        board: &str,
        admin: &str,
        add: bool,
    ) -> Result<Vec<String>> {
        let username = user.username.clone();
        let admin = admin.to_string();
        let meta = self
            .content
            .update_meta(
                board,
                Box::new(move |meta| {
                    if meta.owner != username {
                        return Err(Error::Forbidden(
                            "only the board owner can manage admins".into(),
                        ));
                    }
                    if add {
                        if !meta.admins.iter().any(|a| a == &admin) {
                            meta.admins.push(admin.clone());
                        }
                    } else {
                        meta.admins.retain(|a| a != &admin);
                    }
                    Ok(())
                }),
            )
            .await?;
        Ok(meta.admins)
    }

    /// The raw metadata document for the management UI. Unclaimed boards
    /// present a synthetic document owned by `system`.
    pub async fn manage_info(&self, board: &str) -> Result<Value> {
        match self.content.read_meta(board).await? {
            Some(meta) => Ok(serde_json::to_value(meta)?),
            None => Ok(json!({
                "owner": "system",
                "blacklist": [],
                "sectionAdmins": {},
                "sectionSettings": {},
                "muted": false,
            })),
        }
    }

    /// Creates a section. Requires at least board-admin standing on the
    /// board, which on an unclaimed board leaves super admins as the only
    /// callers that pass.
    pub async fn create_section(&self, user: &SessionUser, board: &str, name: &str) -> Result<()> {
        if !self.content.board_exists(board).await? {
            return Err(Error::NotFound("board".into()));
        }
        let level = self
            .permissions
            .resolve(&user.username, Some(board), None)
            .await?;
        if level < PermissionLevel::BoardAdmin {
            return Err(Error::Forbidden(
                "only a super admin, the board owner, or a board admin can create sections".into(),
            ));
        }
        self.content.create_section(board, name).await
    }
}

fn apply_section_order(mut sections: Vec<String>, order: &[String]) -> Vec<String> {
    sections.sort_by(|a, b| {
        let ia = order.iter().position(|s| s == a);
        let ib = order.iter().position(|s| s == b);
        match (ia, ib) {
            (None, None) => a.cmp(b),
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
            (Some(x), Some(y)) => x.cmp(&y),
        }
    });
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_adapters::FsContentStore;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<dyn ContentStore>, BoardService) {
        let dir = TempDir::new().unwrap();
        let content: Arc<dyn ContentStore> =
            Arc::new(FsContentStore::new(dir.path()).await.unwrap());
        let permissions = Arc::new(PermissionService::new(
            content.clone(),
            ["root".to_string()],
        ));
        let service = BoardService::new(content.clone(), permissions);
        (dir, content, service)
    }

    fn user(name: &str) -> SessionUser {
        SessionUser::new(name)
    }

    #[tokio::test]
    async fn ordered_sections_come_first_then_lexicographic() {
        let (_dir, content, service) = setup().await;
        content.create_board("General", "olivia").await.unwrap();
        for section in ["a", "b", "c"] {
            content.create_section("General", section).await.unwrap();
        }
        content
            .update_meta(
                "General",
                Box::new(|meta| {
                    meta.sections_order = vec!["b".into(), "a".into()];
                    Ok(())
                }),
            )
            .await
            .unwrap();

        let structure = service.structure().await.unwrap();
        assert_eq!(structure["General"], vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn unclaimed_boards_list_sections_lexicographically() {
        let (dir, _content, service) = setup().await;
        std::fs::create_dir_all(dir.path().join("Wild").join("z")).unwrap();
        std::fs::create_dir_all(dir.path().join("Wild").join("a")).unwrap();

        let structure = service.structure().await.unwrap();
        assert_eq!(structure["Wild"], vec!["a", "z"]);
    }

    #[tokio::test]
    async fn creating_a_board_claims_it_for_the_caller() {
        let (_dir, content, service) = setup().await;
        service.create_board(&user("olivia"), "General").await.unwrap();

        let meta = content.read_meta("General").await.unwrap().unwrap();
        assert_eq!(meta.owner, "olivia");

        let err = service.create_board(&user("ben"), "General").await.unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[tokio::test]
    async fn board_rename_and_delete_are_super_only() {
        let (_dir, content, service) = setup().await;
        content.create_board("General", "olivia").await.unwrap();

        let err = service
            .rename_board(&user("olivia"), "General", "Misc")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        service.rename_board(&user("root"), "General", "Misc").await.unwrap();
        assert_eq!(content.list_boards().await.unwrap(), vec!["Misc"]);

        let err = service.delete_board(&user("olivia"), "Misc").await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        service.delete_board(&user("root"), "Misc").await.unwrap();
        assert!(content.list_boards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_roster_is_owner_exact() {
        let (_dir, content, service) = setup().await;
        content.create_board("General", "olivia").await.unwrap();

        // Role-exact: the super admin is refused here.
        let err = service
            .set_admin(&user("root"), "General", "ben", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let admins = service
            .set_admin(&user("olivia"), "General", "ben", true)
            .await
            .unwrap();
        assert_eq!(admins, vec!["ben"]);

        // Adding twice keeps the roster deduplicated.
        let admins = service
            .set_admin(&user("olivia"), "General", "ben", true)
            .await
            .unwrap();
        assert_eq!(admins, vec!["ben"]);

        let admins = service
            .set_admin(&user("olivia"), "General", "ben", false)
            .await
            .unwrap();
        assert!(admins.is_empty());
    }

    #[tokio::test]
    async fn section_creation_needs_board_admin_standing() {
        let (_dir, content, service) = setup().await;
        content.create_board("General", "olivia").await.unwrap();
        content
            .update_meta(
                "General",
                Box::new(|meta| {
                    meta.admins.push("ben".into());
                    meta.section_admins.insert("News".into(), vec!["sam".into()]);
                    Ok(())
                }),
            )
            .await
            .unwrap();

        service.create_section(&user("olivia"), "General", "News").await.unwrap();
        service.create_section(&user("ben"), "General", "Tech").await.unwrap();
        service.create_section(&user("root"), "General", "Meta").await.unwrap();

        // Section admins and strangers stay below the threshold.
        for name in ["sam", "zoe"] {
            let err = service
                .create_section(&user(name), "General", "Blocked")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Forbidden(_)));
        }

        let err = service
            .create_section(&user("olivia"), "General", "News")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));

        let err = service
            .create_section(&user("root"), "Missing", "News")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn manage_info_synthesizes_a_document_for_unclaimed_boards() {
        let (dir, _content, service) = setup().await;
        std::fs::create_dir_all(dir.path().join("Wild")).unwrap();

        let info = service.manage_info("Wild").await.unwrap();
        assert_eq!(info["owner"], "system");
        assert_eq!(info["muted"], false);
        assert_eq!(info["sectionAdmins"], json!({}));
    }
}
