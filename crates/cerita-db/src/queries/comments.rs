use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, Row};

use super::{OptionalExt, get_author, get_time};
use crate::models::{CommentRow, CommentTarget};
use crate::{Database, new_id, timestamp};

pub struct NewComment<'a> {
    pub user_id: &'a str,
    pub target: &'a CommentTarget,
    pub parent_id: Option<&'a str>,
    pub content: &'a str,
    pub is_anonymous: bool,
}

const COMMENT_SELECT: &str = "
    SELECT c.id, c.rowid, c.story_id, c.journal_id, c.announcement_id, c.parent_id,
           c.content, c.is_anonymous, c.created_at, c.updated_at,
           u.id, u.name, u.avatar, u.role
    FROM comments c
    JOIN users u ON u.id = c.user_id";

impl Database {
    pub fn insert_comment(&self, comment: &NewComment<'_>) -> Result<CommentRow> {
        let id = new_id();
        let now = timestamp(Utc::now());
        let target = comment.target;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments
                    (id, user_id, story_id, journal_id, announcement_id, parent_id,
                     content, is_anonymous, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    id,
                    comment.user_id,
                    target.story_id(),
                    target.journal_id(),
                    target.announcement_id(),
                    comment.parent_id,
                    comment.content,
                    comment.is_anonymous,
                    now,
                ],
            )?;
            query_comment(conn, &id)?.ok_or_else(|| anyhow!("Comment vanished after insert: {}", id))
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    /// Every comment on one resource, oldest first.
    pub fn comments_for(&self, target: &CommentTarget) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT}
                 WHERE c.story_id IS ?1 AND c.journal_id IS ?2 AND c.announcement_id IS ?3
                 ORDER BY c.created_at ASC, c.rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![target.story_id(), target.journal_id(), target.announcement_id()],
                    map_comment,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: &str, content: &str) -> Result<Option<CommentRow>> {
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, content, now],
            )?;
            query_comment(conn, id)
        })
    }

    /// Replies go with their parent through the foreign-key cascade.
    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM comments WHERE id = ?1", [id])? > 0))
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    let story_id: Option<String> = row.get(2)?;
    let journal_id: Option<String> = row.get(3)?;
    let announcement_id: Option<String> = row.get(4)?;
    let target = match (story_id, journal_id, announcement_id) {
        (Some(id), None, None) => CommentTarget::Story(id),
        (None, Some(id), None) => CommentTarget::Journal(id),
        (None, None, Some(id)) => CommentTarget::Announcement(id),
        _ => {
            return Err(rusqlite::Error::InvalidColumnType(
                2,
                "story_id/journal_id/announcement_id".into(),
                rusqlite::types::Type::Null,
            ));
        }
    };

    Ok(CommentRow {
        id: row.get(0)?,
        seq: row.get(1)?,
        target,
        parent_id: row.get(5)?,
        content: row.get(6)?,
        is_anonymous: row.get(7)?,
        created_at: get_time(row, 8)?,
        updated_at: get_time(row, 9)?,
        author: get_author(row, 10)?,
    })
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<CommentRow>> {
    let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], map_comment).optional()
}
