//! # Domain Models
//!
//! These structs mirror the JSON documents kept on disk: post files, board
//! metadata (`owner.json`) and per-user documents. Every document type
//! carries a flattened `extra` map so keys written by other tools survive a
//! read-modify-write cycle untouched.

use std::collections::BTreeMap;

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered permission scale. A higher level implies every right of the
/// levels below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PermissionLevel {
    None = 0,
    Poster = 1,
    SectionAdmin = 2,
    BoardAdmin = 3,
    BoardOwner = 4,
    Super = 5,
}

/// Where a pinned post surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinScope {
    Today,
    Board,
    Section,
}

/// Pin expiry moment, stored as epoch milliseconds with `-1` meaning never.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinExpiry {
    Never,
    At(i64),
}

impl Serialize for PinExpiry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PinExpiry::Never => serializer.serialize_i64(-1),
            PinExpiry::At(ms) => serializer.serialize_i64(*ms),
        }
    }
}

impl<'de> Deserialize<'de> for PinExpiry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ms = i64::deserialize(deserializer)?;
        Ok(if ms == -1 { PinExpiry::Never } else { PinExpiry::At(ms) })
    }
}

/// Pin marker attached to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub level: PinScope,
    #[serde(rename = "expireAt")]
    pub expire_at: PinExpiry,
}

/// One entry of the append-only audit trail inside each post document.
/// The `type` tag on the wire selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HistoryEntry {
    Publish {
        user: String,
        #[serde(with = "ts_milliseconds")]
        time: DateTime<Utc>,
    },
    Edit {
        user: String,
        #[serde(with = "ts_milliseconds")]
        time: DateTime<Utc>,
        #[serde(rename = "oldTitle")]
        old_title: String,
        #[serde(rename = "oldContent")]
        old_content: String,
    },
    Move {
        user: String,
        #[serde(with = "ts_milliseconds")]
        time: DateTime<Utc>,
        /// Source as `board/section`.
        from: String,
        /// Destination as `board/section`.
        to: String,
    },
    Like {
        user: String,
        #[serde(with = "ts_milliseconds")]
        time: DateTime<Utc>,
    },
    Share {
        user: String,
        #[serde(with = "ts_milliseconds")]
        time: DateTime<Utc>,
    },
    Vote {
        user: String,
        #[serde(with = "ts_milliseconds")]
        time: DateTime<Utc>,
        option: String,
    },
    Pin {
        user: String,
        #[serde(with = "ts_milliseconds")]
        time: DateTime<Utc>,
        level: PinScope,
    },
}

/// A comment below a post. Comments are append-only and leave no history
/// entry on the post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    pub content: String,
    #[serde(with = "ts_milliseconds")]
    pub time: DateTime<Utc>,
}

/// A post document, one file per post under `{board}/{section}/`.
///
/// `likes` holds usernames in like order; `votes` maps a poll option to its
/// voters. `shares` exists in stored documents but nothing increments it;
/// share tracking happens through `HistoryEntry::Share`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(with = "ts_milliseconds")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub votes: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Pin>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Post {
    /// A freshly published post, stamped now and carrying its `publish`
    /// history entry.
    pub fn publish(author: &SessionUser, title: String, content: String, tags: Vec<String>) -> Self {
        let now = now_millis();
        Post {
            title,
            content,
            author: author.username.clone(),
            author_avatar: author.avatar.clone(),
            author_email: author.email.clone(),
            time: now,
            tags,
            likes: Vec::new(),
            shares: 0,
            comments: Vec::new(),
            votes: BTreeMap::new(),
            pinned: None,
            history: vec![HistoryEntry::Publish {
                user: author.username.clone(),
                time: now,
            }],
            extra: Map::new(),
        }
    }

    /// True when `username` has voted on any option.
    pub fn has_voted(&self, username: &str) -> bool {
        self.votes.values().any(|voters| voters.iter().any(|v| v == username))
    }
}

/// Addresses one post file inside the content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLocation {
    pub board: String,
    pub section: String,
    pub filename: String,
}

impl PostLocation {
    pub fn new(
        board: impl Into<String>,
        section: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        PostLocation {
            board: board.into(),
            section: section.into(),
            filename: filename.into(),
        }
    }
}

impl std::fmt::Display for PostLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.board, self.section, self.filename)
    }
}

/// A post joined with its location, the unit listings return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub board: String,
    pub section: String,
    pub filename: String,
    #[serde(flatten)]
    pub post: Post,
}

/// Per-section knobs under `sectionSettings` in `owner.json`.
///
/// The management UI merges arbitrary keys into a section's settings, so
/// anything not modeled explicitly (display image, rename markers, future
/// knobs) rides along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionSettings {
    #[serde(default, skip_serializing_if = "is_false")]
    pub muted: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blacklist: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SectionSettings {
    /// Shallow-merges a free-form config patch. Typed fields update when the
    /// incoming value has the expected shape; everything else is stored
    /// verbatim.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            match key.as_str() {
                "muted" => self.muted = value.as_bool().unwrap_or(self.muted),
                "blacklist" => {
                    if let Ok(list) = serde_json::from_value::<Vec<String>>(value.clone()) {
                        self.blacklist = list;
                    }
                }
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Board metadata document (`{board}/owner.json`).
///
/// A freshly created board serializes to just `{"owner": name}`; the other
/// fields appear on disk once something sets them. A board directory without
/// this file is *unclaimed* and treats every user as an ordinary poster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardMeta {
    pub owner: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admins: Vec<String>,
    #[serde(rename = "sectionAdmins", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub section_admins: BTreeMap<String, Vec<String>>,
    #[serde(rename = "sectionsOrder", default, skip_serializing_if = "Vec::is_empty")]
    pub sections_order: Vec<String>,
    #[serde(rename = "sectionSettings", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub section_settings: BTreeMap<String, SectionSettings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blacklist: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub muted: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BoardMeta {
    pub fn new(owner: impl Into<String>) -> Self {
        BoardMeta {
            owner: owner.into(),
            admins: Vec::new(),
            section_admins: BTreeMap::new(),
            sections_order: Vec::new(),
            section_settings: BTreeMap::new(),
            blacklist: Vec::new(),
            muted: false,
            extra: Map::new(),
        }
    }

    /// True when the board as a whole or the named section is muted.
    pub fn is_muted(&self, section: &str) -> bool {
        self.muted
            || self
                .section_settings
                .get(section)
                .map(|s| s.muted)
                .unwrap_or(false)
    }

    /// True when the user sits on the board blacklist or the section's.
    pub fn is_blacklisted(&self, section: &str, username: &str) -> bool {
        self.blacklist.iter().any(|u| u == username)
            || self
                .section_settings
                .get(section)
                .map(|s| s.blacklist.iter().any(|u| u == username))
                .unwrap_or(false)
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.admins.iter().any(|u| u == username)
    }

    pub fn is_section_admin(&self, section: &str, username: &str) -> bool {
        self.section_admins
            .get(section)
            .map(|list| list.iter().any(|u| u == username))
            .unwrap_or(false)
    }
}

/// Follow lists: boards by name, sections as `board/section`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Following {
    #[serde(default)]
    pub boards: Vec<String>,
    #[serde(default)]
    pub sections: Vec<String>,
}

impl Following {
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty() && self.sections.is_empty()
    }
}

/// Per-user document (`users/{username}.json`), created lazily on the first
/// follow or settings save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(default, skip_serializing_if = "Following::is_empty")]
    pub following: Following,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The passport payload carried in the signed session cookie. Only the
/// fields used server-side are typed; the rest of the upstream profile
/// passes through in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionUser {
    pub fn new(username: impl Into<String>) -> Self {
        SessionUser {
            username: username.into(),
            email: None,
            avatar: None,
            extra: Map::new(),
        }
    }
}

/// The current instant truncated to millisecond precision, the resolution
/// every stored timestamp uses. Working at this resolution from the start
/// keeps in-memory values identical to their round-tripped form.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Builds a post filename: epoch milliseconds, an underscore, five random
/// base36 characters, `.json`.
pub fn post_filename(time: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..5)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}_{}.json", time.timestamp_millis(), suffix)
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn permission_levels_are_ordered() {
        assert!(PermissionLevel::Poster < PermissionLevel::SectionAdmin);
        assert!(PermissionLevel::SectionAdmin < PermissionLevel::BoardAdmin);
        assert!(PermissionLevel::BoardAdmin < PermissionLevel::BoardOwner);
        assert!(PermissionLevel::BoardOwner < PermissionLevel::Super);
    }

    #[test]
    fn fresh_board_meta_serializes_to_owner_only() {
        let meta = BoardMeta::new("alice");
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value, json!({ "owner": "alice" }));
    }

    #[test]
    fn board_meta_round_trips_unknown_keys() {
        let raw = json!({
            "owner": "alice",
            "admins": ["bob"],
            "sectionAdmins": { "News": ["carol"] },
            "theme": "dark"
        });
        let meta: BoardMeta = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(meta.owner, "alice");
        assert!(meta.is_admin("bob"));
        assert!(meta.is_section_admin("News", "carol"));
        assert_eq!(serde_json::to_value(&meta).unwrap(), raw);
    }

    #[test]
    fn history_entries_use_the_type_tag() {
        let entry = HistoryEntry::Edit {
            user: "alice".into(),
            time: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            old_title: "old".into(),
            old_content: "body".into(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "edit",
                "user": "alice",
                "time": 1_700_000_000_000i64,
                "oldTitle": "old",
                "oldContent": "body"
            })
        );

        let pin: HistoryEntry = serde_json::from_value(json!({
            "type": "pin",
            "user": "root",
            "time": 1_700_000_000_000i64,
            "level": "board"
        }))
        .unwrap();
        assert!(matches!(pin, HistoryEntry::Pin { level: PinScope::Board, .. }));
    }

    #[test]
    fn pin_expiry_uses_minus_one_for_never() {
        let pin = Pin {
            level: PinScope::Today,
            expire_at: PinExpiry::Never,
        };
        let value = serde_json::to_value(&pin).unwrap();
        assert_eq!(value, json!({ "level": "today", "expireAt": -1 }));

        let parsed: Pin =
            serde_json::from_value(json!({ "level": "section", "expireAt": 12345 })).unwrap();
        assert_eq!(parsed.expire_at, PinExpiry::At(12345));
    }

    #[test]
    fn post_defaults_missing_collections_on_read() {
        // Documents written by earlier tooling carry only the publish-time
        // fields; everything else must default.
        let raw = json!({
            "title": "Hello",
            "content": "First!",
            "author": "alice",
            "time": 1_700_000_000_000i64
        });
        let post: Post = serde_json::from_value(raw).unwrap();
        assert!(post.likes.is_empty());
        assert_eq!(post.shares, 0);
        assert!(post.comments.is_empty());
        assert!(post.votes.is_empty());
        assert!(post.history.is_empty());
        assert!(post.pinned.is_none());
    }

    #[test]
    fn post_record_flattens_the_post() {
        let author = SessionUser::new("alice");
        let record = PostRecord {
            board: "General".into(),
            section: "News".into(),
            filename: "1_abc.json".into(),
            post: Post::publish(&author, "t".into(), "c".into(), vec![]),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["board"], "General");
        assert_eq!(value["section"], "News");
        assert_eq!(value["filename"], "1_abc.json");
        assert_eq!(value["title"], "t");
        assert_eq!(value["likes"], json!([]));
        assert_eq!(value["shares"], json!(0));
    }

    #[test]
    fn section_settings_merge_keeps_unknown_keys() {
        let mut settings = SectionSettings::default();
        let patch = json!({ "muted": true, "image": "/res/a.png", "newName": "Tech" });
        settings.merge(patch.as_object().unwrap());
        assert!(settings.muted);
        assert_eq!(settings.extra["image"], "/res/a.png");
        assert_eq!(settings.extra["newName"], "Tech");
    }

    #[test]
    fn post_filename_shape() {
        let time = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let name = post_filename(time);
        let (stamp, rest) = name.split_once('_').unwrap();
        assert_eq!(stamp, "1700000000000");
        let suffix = rest.strip_suffix(".json").unwrap();
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn has_voted_scans_every_option() {
        let author = SessionUser::new("alice");
        let mut post = Post::publish(&author, "poll".into(), "?".into(), vec![]);
        post.votes.insert("yes".into(), vec!["bob".into()]);
        assert!(post.has_voted("bob"));
        assert!(!post.has_voted("carol"));
    }
}
