//! Shared handler state: one `Arc` of wired services.

use std::sync::Arc;

use auth_adapters::SessionCodec;
use domains::{ContentStore, UserStore};
use services::{
    BoardService, ModerationService, PermissionService, PostService, SearchService, SocialService,
    StatsService,
};

use crate::metrics::Metrics;

pub struct AppState {
    pub permissions: Arc<PermissionService>,
    pub boards: Arc<BoardService>,
    pub posts: Arc<PostService>,
    pub social: Arc<SocialService>,
    pub moderation: Arc<ModerationService>,
    pub search: Arc<SearchService>,
    pub stats: Arc<StatsService>,
    pub sessions: SessionCodec,
    pub metrics: Metrics,
}

impl AppState {
    /// Wires the full service graph over a pair of stores.
    pub fn new(
        content: Arc<dyn ContentStore>,
        users: Arc<dyn UserStore>,
        sessions: SessionCodec,
        super_admins: Vec<String>,
    ) -> Arc<Self> {
        let permissions = Arc::new(PermissionService::new(content.clone(), super_admins));
        Arc::new(AppState {
            boards: Arc::new(BoardService::new(content.clone(), permissions.clone())),
            posts: Arc::new(PostService::new(content.clone(), permissions.clone())),
            social: Arc::new(SocialService::new(content.clone(), users.clone())),
            moderation: Arc::new(ModerationService::new(content.clone(), permissions.clone())),
            search: Arc::new(SearchService::new(content.clone(), users)),
            stats: Arc::new(StatsService::new(content)),
            permissions,
            sessions,
            metrics: Metrics::new(),
        })
    }
}
