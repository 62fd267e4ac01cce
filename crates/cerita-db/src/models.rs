//! Database row types, mapped directly from SQLite rows.
//! Distinct from cerita-types API models to keep the DB layer independent.
use chrono::{DateTime, NaiveDate, Utc};

use cerita_types::{MoodType, Privacy, ReactionType, Role};

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The author columns joined onto every content row.
#[derive(Debug, Clone)]
pub struct AuthorRow {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: Role,
}

#[derive(Debug)]
pub struct StoryRow {
    pub id: String,
    pub author: AuthorRow,
    pub title: String,
    pub content: String,
    pub thumbnail: Option<String>,
    pub tags: Vec<String>,
    pub privacy: Privacy,
    pub is_interactive: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reaction_count: i64,
    pub comment_count: i64,
}

#[derive(Debug)]
pub struct JournalRow {
    pub id: String,
    pub author: AuthorRow,
    pub title: String,
    pub content: String,
    pub privacy: Privacy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct AnnouncementRow {
    pub id: String,
    pub author: AuthorRow,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comment_count: i64,
}

/// The single resource a comment hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Story(String),
    Journal(String),
    Announcement(String),
}

impl CommentTarget {
    pub fn story_id(&self) -> Option<&str> {
        match self {
            CommentTarget::Story(id) => Some(id),
            _ => None,
        }
    }

    pub fn journal_id(&self) -> Option<&str> {
        match self {
            CommentTarget::Journal(id) => Some(id),
            _ => None,
        }
    }

    pub fn announcement_id(&self) -> Option<&str> {
        match self {
            CommentTarget::Announcement(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct CommentRow {
    pub id: String,
    /// Insertion order, used to break `created_at` ties.
    pub seq: i64,
    pub author: AuthorRow,
    pub target: CommentTarget,
    pub parent_id: Option<String>,
    pub content: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ReactionRow {
    pub id: String,
    pub story_id: String,
    pub user_id: String,
    pub kind: ReactionType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MoodRow {
    pub id: String,
    pub user_id: String,
    pub kind: MoodType,
    pub note: Option<String>,
    pub mood_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
