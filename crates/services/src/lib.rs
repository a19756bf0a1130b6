//! # services
//!
//! The use-case layer for corkboard. Each service wraps the storage ports
//! with one area of behavior: permission resolution, board and section
//! lifecycle, post lifecycle, the social mutators, moderation, search and
//! site statistics. Services hold `Arc<dyn Port>` handles and never touch
//! the file system directly.

pub mod boards;
pub mod moderation;
pub mod permissions;
pub mod posts;
pub mod search;
pub mod social;
pub mod stats;

pub use boards::BoardService;
pub use moderation::ModerationService;
pub use permissions::{PermissionGrants, PermissionService, SectionGrant};
pub use posts::PostService;
pub use search::{SearchResults, SearchService};
pub use social::{FollowKind, SocialService};
pub use stats::{
    LeaderboardEntry, PostRanking, RankedKind, RankedSubject, StatsService, UserProfile,
};
