use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};

use cerita_types::Privacy;

use super::{OptionalExt, get_author, get_enum, get_time};
use crate::models::JournalRow;
use crate::{Database, new_id, timestamp};

pub struct JournalListFilter<'a> {
    pub viewer_id: Option<&'a str>,
    /// Narrows to one privacy level; PRIVATE still only yields the viewer's own.
    pub privacy: Option<Privacy>,
    pub author_id: Option<&'a str>,
    pub limit: u32,
    pub offset: u32,
}

/// The diary dashboard differs by role.
#[derive(Debug, Clone, Copy)]
pub enum DiaryScope<'a> {
    /// Teacher view: student journals that are PUBLIC or ANONYMOUS.
    SharedByStudents,
    /// Student view: every journal the student wrote.
    OwnedBy(&'a str),
}

pub struct NewJournal<'a> {
    pub author_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub privacy: Privacy,
}

#[derive(Default)]
pub struct JournalPatch<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub privacy: Option<Privacy>,
}

const JOURNAL_SELECT: &str = "
    SELECT j.id, j.title, j.content, j.privacy, j.created_at, j.updated_at,
           u.id, u.name, u.avatar, u.role
    FROM journals j
    JOIN users u ON u.id = j.author_id";

// ?1 viewer_id, ?2 privacy, ?3 author_id
const JOURNAL_LIST_WHERE: &str = "
    WHERE (j.privacy != 'PRIVATE' OR j.author_id = ?1)
      AND (?2 IS NULL OR j.privacy = ?2)
      AND (?3 IS NULL OR j.author_id = ?3)";

// ?1 owner id (NULL for the teacher view)
const DIARY_WHERE: &str = "
    WHERE ((?1 IS NULL AND u.role = 'SISWA' AND j.privacy IN ('PUBLIC', 'ANONYMOUS'))
           OR j.author_id = ?1)";

impl Database {
    pub fn list_journals(&self, filter: &JournalListFilter<'_>) -> Result<(Vec<JournalRow>, u64)> {
        let privacy = filter.privacy.map(|p| p.as_str());
        self.with_conn(|conn| {
            let sql = format!(
                "{JOURNAL_SELECT} {JOURNAL_LIST_WHERE}
                 ORDER BY j.created_at DESC, j.rowid DESC
                 LIMIT ?4 OFFSET ?5"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![filter.viewer_id, privacy, filter.author_id, filter.limit, filter.offset],
                    map_journal,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let count_sql = format!("SELECT COUNT(*) FROM journals j {JOURNAL_LIST_WHERE}");
            let total: i64 = conn.query_row(
                &count_sql,
                rusqlite::params![filter.viewer_id, privacy, filter.author_id],
                |row| row.get(0),
            )?;

            Ok((rows, total as u64))
        })
    }

    pub fn list_diary(&self, scope: DiaryScope<'_>, limit: u32, offset: u32) -> Result<(Vec<JournalRow>, u64)> {
        let owner = match scope {
            DiaryScope::SharedByStudents => None,
            DiaryScope::OwnedBy(id) => Some(id),
        };
        self.with_conn(|conn| {
            let sql = format!(
                "{JOURNAL_SELECT} {DIARY_WHERE}
                 ORDER BY j.created_at DESC, j.rowid DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![owner, limit, offset], map_journal)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let count_sql = format!(
                "SELECT COUNT(*) FROM journals j JOIN users u ON u.id = j.author_id {DIARY_WHERE}"
            );
            let total: i64 = conn.query_row(&count_sql, [owner], |row| row.get(0))?;

            Ok((rows, total as u64))
        })
    }

    pub fn insert_journal(&self, journal: &NewJournal<'_>) -> Result<JournalRow> {
        let id = new_id();
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO journals (id, author_id, title, content, privacy, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![
                    id,
                    journal.author_id,
                    journal.title,
                    journal.content,
                    journal.privacy.as_str(),
                    now
                ],
            )?;
            query_journal(conn, &id)?.ok_or_else(|| anyhow::anyhow!("Journal vanished after insert: {}", id))
        })
    }

    pub fn get_journal(&self, id: &str) -> Result<Option<JournalRow>> {
        self.with_conn(|conn| query_journal(conn, id))
    }

    pub fn update_journal(&self, id: &str, patch: &JournalPatch<'_>) -> Result<Option<JournalRow>> {
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE journals SET
                    title = COALESCE(?2, title),
                    content = COALESCE(?3, content),
                    privacy = COALESCE(?4, privacy),
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id, patch.title, patch.content, patch.privacy.map(|p| p.as_str()), now],
            )?;
            query_journal(conn, id)
        })
    }

    pub fn delete_journal(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM journals WHERE id = ?1", [id])? > 0))
    }
}

fn map_journal(row: &Row<'_>) -> rusqlite::Result<JournalRow> {
    Ok(JournalRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        privacy: get_enum(row, 3)?,
        created_at: get_time(row, 4)?,
        updated_at: get_time(row, 5)?,
        author: get_author(row, 6)?,
    })
}

fn query_journal(conn: &Connection, id: &str) -> Result<Option<JournalRow>> {
    let sql = format!("{JOURNAL_SELECT} WHERE j.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], map_journal).optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;
    use cerita_types::Role;

    fn journal<'a>(author_id: &'a str, privacy: Privacy) -> NewJournal<'a> {
        NewJournal {
            author_id,
            title: "hari ini",
            content: "isi jurnal",
            privacy,
        }
    }

    #[test]
    fn teacher_diary_never_includes_private_or_teacher_journals() {
        let db = Database::open_in_memory().unwrap();
        let student = fixtures::user(&db, "siswa@sekolah.id", Role::Student);
        let teacher = fixtures::user(&db, "guru@sekolah.id", Role::Teacher);

        let public = db.insert_journal(&journal(&student.id, Privacy::Public)).unwrap();
        let anon = db.insert_journal(&journal(&student.id, Privacy::Anonymous)).unwrap();
        db.insert_journal(&journal(&student.id, Privacy::Private)).unwrap();
        db.insert_journal(&journal(&teacher.id, Privacy::Public)).unwrap();

        let (rows, total) = db.list_diary(DiaryScope::SharedByStudents, 10, 0).unwrap();
        assert_eq!(total, 2);
        let ids: Vec<_> = rows.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec![anon.id.as_str(), public.id.as_str()]);
    }

    #[test]
    fn student_diary_is_every_own_journal() {
        let db = Database::open_in_memory().unwrap();
        let student = fixtures::user(&db, "siswa@sekolah.id", Role::Student);
        let other = fixtures::user(&db, "lain@sekolah.id", Role::Student);

        db.insert_journal(&journal(&student.id, Privacy::Public)).unwrap();
        db.insert_journal(&journal(&student.id, Privacy::Private)).unwrap();
        db.insert_journal(&journal(&other.id, Privacy::Public)).unwrap();

        let (rows, total) = db.list_diary(DiaryScope::OwnedBy(&student.id), 10, 0).unwrap();
        assert_eq!(total, 2);
        assert!(rows.iter().all(|j| j.author.id == student.id));
    }

    #[test]
    fn private_filter_only_returns_viewers_own() {
        let db = Database::open_in_memory().unwrap();
        let a = fixtures::user(&db, "a@sekolah.id", Role::Student);
        let b = fixtures::user(&db, "b@sekolah.id", Role::Student);
        db.insert_journal(&journal(&a.id, Privacy::Private)).unwrap();
        db.insert_journal(&journal(&b.id, Privacy::Private)).unwrap();

        let (rows, total) = db
            .list_journals(&JournalListFilter {
                viewer_id: Some(&a.id),
                privacy: Some(Privacy::Private),
                author_id: None,
                limit: 10,
                offset: 0,
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].author.id, a.id);

        let (_, anonymous_total) = db
            .list_journals(&JournalListFilter {
                viewer_id: None,
                privacy: None,
                author_id: None,
                limit: 10,
                offset: 0,
            })
            .unwrap();
        assert_eq!(anonymous_total, 0);
    }
}
