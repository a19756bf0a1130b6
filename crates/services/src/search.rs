//! Case-insensitive substring search over the whole site.
//!
//! Nothing is indexed: every query walks the directory tree, which is the
//! same cost the listings pay. Fine at bulletin-board scale.

use std::sync::Arc;

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use domains::{ContentStore, Result, UserStore};
use serde::Serialize;

const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Default, Serialize)]
pub struct SearchResults {
    pub posts: Vec<PostHit>,
    pub users: Vec<UserHit>,
    pub boards: Vec<BoardHit>,
    pub sections: Vec<SectionHit>,
}

#[derive(Debug, Serialize)]
pub struct PostHit {
    pub board: String,
    pub section: String,
    pub filename: String,
    pub title: String,
    pub author: String,
    #[serde(with = "ts_milliseconds")]
    pub time: DateTime<Utc>,
    pub preview: String,
    /// Full body; the front end mines it for inline images.
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct BoardHit {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SectionHit {
    pub name: String,
    pub board: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UserHit {
    pub username: String,
}

pub struct SearchService {
    content: Arc<dyn ContentStore>,
    users: Arc<dyn UserStore>,
}

impl SearchService {
    pub fn new(content: Arc<dyn ContentStore>, users: Arc<dyn UserStore>) -> Self {
        SearchService { content, users }
    }

    /// Matches the query against board names, section names, post titles and
    /// bodies, and known usernames. An empty query matches nothing.
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(SearchResults::default());
        }

        let mut results = SearchResults::default();

        for board in self.content.list_boards().await? {
            if board.to_lowercase().contains(&needle) {
                results.boards.push(BoardHit { name: board.clone() });
            }
            for section in self.content.list_sections(&board).await? {
                if section.to_lowercase().contains(&needle) {
                    results.sections.push(SectionHit {
                        name: section,
                        board: board.clone(),
                    });
                }
            }
        }

        for record in self.content.list_all_posts().await? {
            let post = &record.post;
            if post.title.to_lowercase().contains(&needle)
                || post.content.to_lowercase().contains(&needle)
            {
                results.posts.push(PostHit {
                    board: record.board,
                    section: record.section,
                    filename: record.filename,
                    title: post.title.clone(),
                    author: post.author.clone(),
                    time: post.time,
                    preview: preview(&post.content),
                    content: post.content.clone(),
                });
            }
        }

        for username in self.users.list_usernames().await? {
            if username.to_lowercase().contains(&needle) {
                results.users.push(UserHit { username });
            }
        }

        Ok(results)
    }
}

/// First fifty characters of the body, always suffixed. Counted in chars so
/// multibyte content never splits.
fn preview(content: &str) -> String {
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}
