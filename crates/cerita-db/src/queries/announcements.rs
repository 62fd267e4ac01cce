use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};

use super::{OptionalExt, get_author, get_time};
use crate::models::AnnouncementRow;
use crate::{Database, new_id, timestamp};

const ANNOUNCEMENT_SELECT: &str = "
    SELECT a.id, a.title, a.content, a.created_at, a.updated_at,
           u.id, u.name, u.avatar, u.role,
           (SELECT COUNT(*) FROM comments c WHERE c.announcement_id = a.id)
    FROM announcements a
    JOIN users u ON u.id = a.author_id";

impl Database {
    pub fn list_announcements(&self, limit: u32, offset: u32) -> Result<(Vec<AnnouncementRow>, u64)> {
        self.with_conn(|conn| {
            let sql = format!(
                "{ANNOUNCEMENT_SELECT}
                 ORDER BY a.created_at DESC, a.rowid DESC
                 LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], map_announcement)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM announcements", [], |row| row.get(0))?;
            Ok((rows, total as u64))
        })
    }

    pub fn insert_announcement(&self, author_id: &str, title: &str, content: &str) -> Result<AnnouncementRow> {
        let id = new_id();
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO announcements (id, author_id, title, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![id, author_id, title, content, now],
            )?;
            query_announcement(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("Announcement vanished after insert: {}", id))
        })
    }

    pub fn get_announcement(&self, id: &str) -> Result<Option<AnnouncementRow>> {
        self.with_conn(|conn| query_announcement(conn, id))
    }

    pub fn update_announcement(
        &self,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<AnnouncementRow>> {
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE announcements SET
                    title = COALESCE(?2, title),
                    content = COALESCE(?3, content),
                    updated_at = ?4
                 WHERE id = ?1",
                rusqlite::params![id, title, content, now],
            )?;
            query_announcement(conn, id)
        })
    }

    pub fn delete_announcement(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM announcements WHERE id = ?1", [id])? > 0))
    }
}

fn map_announcement(row: &Row<'_>) -> rusqlite::Result<AnnouncementRow> {
    Ok(AnnouncementRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: get_time(row, 3)?,
        updated_at: get_time(row, 4)?,
        author: get_author(row, 5)?,
        comment_count: row.get(9)?,
    })
}

fn query_announcement(conn: &Connection, id: &str) -> Result<Option<AnnouncementRow>> {
    let sql = format!("{ANNOUNCEMENT_SELECT} WHERE a.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], map_announcement).optional()
}
