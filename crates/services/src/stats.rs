//! Site statistics: leaderboards, user profiles, system counters and the
//! daily summary passthrough.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use domains::{now_millis, ContentStore, PostRecord, Result};
use serde::Serialize;
use serde_json::Value;

const LEADERBOARD_SIZE: usize = 50;
const PROFILE_RECENT_POSTS: usize = 5;

/// What a ranked leaderboard aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankedKind {
    User,
    Board,
    Section,
}

/// Who a leaderboard row is about. Users key on `username`, boards on
/// `name`, sections on `name` plus their `board`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RankedSubject {
    User { username: String },
    Board { name: String },
    Section { name: String, board: String },
}

/// One row of a user/board/section leaderboard, ranked by posts plus twice
/// the likes those posts received. The score only orders rows; it is not
/// part of the wire shape.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    #[serde(flatten)]
    pub subject: RankedSubject,
    pub posts: u64,
    pub likes: u64,
    #[serde(skip)]
    pub score: u64,
}

/// One row of the post leaderboard, ranked by raw like count.
#[derive(Debug, Serialize)]
pub struct PostRanking {
    pub title: String,
    pub author: String,
    pub board: String,
    pub section: String,
    pub filename: String,
    pub likes: u64,
    #[serde(with = "ts_milliseconds")]
    pub time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(rename = "postCount")]
    pub post_count: u64,
    #[serde(rename = "receivedLikes")]
    pub received_likes: u64,
    #[serde(rename = "recentPosts")]
    pub recent_posts: Vec<ProfilePost>,
}

/// A trimmed post reference for profile pages.
#[derive(Debug, Serialize)]
pub struct ProfilePost {
    pub title: String,
    pub board: String,
    pub section: String,
    #[serde(with = "ts_milliseconds")]
    pub time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub version: String,
    pub powered_by: String,
    pub stats: SystemCounts,
    pub server_time: i64,
}

#[derive(Debug, Serialize)]
pub struct SystemCounts {
    pub boards: u64,
    pub sections: u64,
    pub posts: u64,
}

pub struct StatsService {
    content: Arc<dyn ContentStore>,
}

impl StatsService {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        StatsService { content }
    }

    /// Aggregated leaderboard, top fifty. `window` bounds post publish times
    /// in epoch milliseconds, inclusive; `None` ranks all time. Boards and
    /// sections show up even when nothing was posted in the window; users
    /// appear once they have a post in it.
    pub async fn ranked_leaderboard(
        &self,
        kind: RankedKind,
        window: Option<(i64, i64)>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let mut tallies: BTreeMap<String, (u64, u64)> = BTreeMap::new();

        match kind {
            RankedKind::Board => {
                for board in self.content.list_boards().await? {
                    tallies.insert(board, (0, 0));
                }
            }
            RankedKind::Section => {
                for board in self.content.list_boards().await? {
                    for section in self.content.list_sections(&board).await? {
                        tallies.insert(format!("{board}/{section}"), (0, 0));
                    }
                }
            }
            RankedKind::User => {}
        }

        for record in self.posts_in_window(window).await? {
            let key = match kind {
                RankedKind::User => record.post.author.clone(),
                RankedKind::Board => record.board.clone(),
                RankedKind::Section => format!("{}/{}", record.board, record.section),
            };
            let tally = tallies.entry(key).or_insert((0, 0));
            tally.0 += 1;
            tally.1 += record.post.likes.len() as u64;
        }

        let mut entries: Vec<LeaderboardEntry> = tallies
            .into_iter()
            .map(|(key, (posts, likes))| LeaderboardEntry {
                subject: Self::subject_for(kind, key),
                posts,
                likes,
                score: posts + 2 * likes,
            })
            .collect();
        // BTreeMap iteration already gives name order, so equal scores tie
        // deterministically.
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(LEADERBOARD_SIZE);
        Ok(entries)
    }

    /// The most-liked posts in the window, top fifty.
    pub async fn post_leaderboard(&self, window: Option<(i64, i64)>) -> Result<Vec<PostRanking>> {
        let mut rankings: Vec<PostRanking> = self
            .posts_in_window(window)
            .await?
            .into_iter()
            .map(|record| PostRanking {
                likes: record.post.likes.len() as u64,
                board: record.board,
                section: record.section,
                title: record.post.title,
                author: record.post.author,
                filename: record.filename,
                time: record.post.time,
            })
            .collect();
        rankings.sort_by(|a, b| b.likes.cmp(&a.likes).then(a.filename.cmp(&b.filename)));
        rankings.truncate(LEADERBOARD_SIZE);
        Ok(rankings)
    }

    /// A user's public profile: totals plus their five newest posts.
    pub async fn profile(&self, username: &str) -> Result<UserProfile> {
        let mut authored: Vec<PostRecord> = self
            .content
            .list_all_posts()
            .await?
            .into_iter()
            .filter(|record| record.post.author == username)
            .collect();

        let post_count = authored.len() as u64;
        let received_likes = authored.iter().map(|r| r.post.likes.len() as u64).sum();
        authored.sort_by(|a, b| b.post.time.cmp(&a.post.time));
        authored.truncate(PROFILE_RECENT_POSTS);

        Ok(UserProfile {
            username: username.to_string(),
            post_count,
            received_likes,
            recent_posts: authored
                .into_iter()
                .map(|record| ProfilePost {
                    title: record.post.title,
                    board: record.board,
                    section: record.section,
                    time: record.post.time,
                })
                .collect(),
        })
    }

    /// Site-wide counters for the footer and health checks.
    pub async fn system_stats(&self) -> Result<SystemStats> {
        let boards = self.content.list_boards().await?;
        let mut sections = 0u64;
        for board in &boards {
            sections += self.content.list_sections(board).await?.len() as u64;
        }
        let posts = self.content.list_all_posts().await?.len() as u64;

        Ok(SystemStats {
            version: env!("CARGO_PKG_VERSION").to_string(),
            powered_by: "corkboard".to_string(),
            stats: SystemCounts {
                boards: boards.len() as u64,
                sections,
                posts,
            },
            server_time: now_millis().timestamp_millis(),
        })
    }

    /// `daily_summary.json`, written by an external job. `None` when there
    /// is no summary yet.
    pub async fn summary(&self) -> Result<Option<Value>> {
        self.content.read_summary().await
    }

    fn subject_for(kind: RankedKind, key: String) -> RankedSubject {
        match kind {
            RankedKind::User => RankedSubject::User { username: key },
            RankedKind::Board => RankedSubject::Board { name: key },
            // Section tallies key on "board/section"; path components cannot
            // contain a slash, so the first one is the divider.
            RankedKind::Section => match key.split_once('/') {
                Some((board, name)) => RankedSubject::Section {
                    name: name.to_string(),
                    board: board.to_string(),
                },
                None => RankedSubject::Section {
                    name: key,
                    board: String::new(),
                },
            },
        }
    }

    async fn posts_in_window(&self, window: Option<(i64, i64)>) -> Result<Vec<PostRecord>> {
        let records = self.content.list_all_posts().await?;
        Ok(match window {
            None => records,
            Some((start, end)) => records
                .into_iter()
                .filter(|r| {
                    let t = r.post.time.timestamp_millis();
                    t >= start && t <= end
                })
                .collect(),
        })
    }
}
