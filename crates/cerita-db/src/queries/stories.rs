use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};

use cerita_types::Privacy;

use super::{OptionalExt, get_author, get_enum, get_time};
use crate::models::StoryRow;
use crate::{Database, new_id, timestamp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorySort {
    #[default]
    Latest,
    Popular,
}

impl StorySort {
    fn as_str(&self) -> &'static str {
        match self {
            StorySort::Latest => "latest",
            StorySort::Popular => "popular",
        }
    }
}

pub struct StoryListFilter<'a> {
    /// Sees their own PRIVATE stories in the default listing.
    pub viewer_id: Option<&'a str>,
    /// Only PUBLIC stories, the viewer's own included.
    pub public_only: bool,
    pub tag: Option<&'a str>,
    pub sort: StorySort,
    pub limit: u32,
    pub offset: u32,
}

pub struct NewStory<'a> {
    pub author_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub thumbnail: Option<&'a str>,
    pub tags: &'a [String],
    pub privacy: Privacy,
    pub is_interactive: bool,
}

#[derive(Default)]
pub struct StoryPatch<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub thumbnail: Option<Option<&'a str>>,
    pub tags: Option<&'a [String]>,
    pub privacy: Option<Privacy>,
    pub is_interactive: Option<bool>,
}

const STORY_SELECT: &str = "
    SELECT s.id, s.title, s.content, s.thumbnail, s.tags, s.privacy, s.is_interactive,
           s.view_count, s.created_at, s.updated_at,
           u.id, u.name, u.avatar, u.role,
           (SELECT COUNT(*) FROM reactions r WHERE r.story_id = s.id),
           (SELECT COUNT(*) FROM comments c WHERE c.story_id = s.id)
    FROM stories s
    JOIN users u ON u.id = s.author_id";

// ?1 public_only, ?2 viewer_id, ?3 tag
const STORY_LIST_WHERE: &str = "
    WHERE ((?1 AND s.privacy = 'PUBLIC')
           OR (NOT ?1 AND (s.privacy != 'PRIVATE' OR s.author_id = ?2)))
      AND (?3 IS NULL OR EXISTS (SELECT 1 FROM json_each(s.tags) WHERE json_each.value = ?3))";

impl Database {
    pub fn list_stories(&self, filter: &StoryListFilter<'_>) -> Result<(Vec<StoryRow>, u64)> {
        self.with_conn(|conn| {
            let sql = format!(
                "{STORY_SELECT} {STORY_LIST_WHERE}
                 ORDER BY CASE WHEN ?4 = 'popular' THEN s.view_count END DESC,
                          s.created_at DESC, s.rowid DESC
                 LIMIT ?5 OFFSET ?6"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![
                        filter.public_only,
                        filter.viewer_id,
                        filter.tag,
                        filter.sort.as_str(),
                        filter.limit,
                        filter.offset,
                    ],
                    map_story,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let count_sql = format!("SELECT COUNT(*) FROM stories s {STORY_LIST_WHERE}");
            let total: i64 = conn.query_row(
                &count_sql,
                rusqlite::params![filter.public_only, filter.viewer_id, filter.tag],
                |row| row.get(0),
            )?;

            Ok((rows, total as u64))
        })
    }

    pub fn insert_story(&self, story: &NewStory<'_>) -> Result<StoryRow> {
        let id = new_id();
        let now = timestamp(Utc::now());
        let tags = serde_json::to_string(story.tags)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO stories
                    (id, author_id, title, content, thumbnail, tags, privacy, is_interactive,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    id,
                    story.author_id,
                    story.title,
                    story.content,
                    story.thumbnail,
                    tags,
                    story.privacy.as_str(),
                    story.is_interactive,
                    now,
                ],
            )?;
            query_story(conn, &id)?.ok_or_else(|| anyhow::anyhow!("Story vanished after insert: {}", id))
        })
    }

    pub fn get_story(&self, id: &str) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| query_story(conn, id))
    }

    pub fn increment_story_views(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE stories SET view_count = view_count + 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn update_story(&self, id: &str, patch: &StoryPatch<'_>) -> Result<Option<StoryRow>> {
        let now = timestamp(Utc::now());
        let tags = patch.tags.map(serde_json::to_string).transpose()?;
        let (set_thumbnail, thumbnail) = match patch.thumbnail {
            Some(value) => (true, value),
            None => (false, None),
        };
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE stories SET
                    title = COALESCE(?2, title),
                    content = COALESCE(?3, content),
                    thumbnail = CASE WHEN ?4 THEN ?5 ELSE thumbnail END,
                    tags = COALESCE(?6, tags),
                    privacy = COALESCE(?7, privacy),
                    is_interactive = COALESCE(?8, is_interactive),
                    updated_at = ?9
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    patch.title,
                    patch.content,
                    set_thumbnail,
                    thumbnail,
                    tags,
                    patch.privacy.map(|p| p.as_str()),
                    patch.is_interactive,
                    now,
                ],
            )?;
            query_story(conn, id)
        })
    }

    pub fn delete_story(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM stories WHERE id = ?1", [id])? > 0))
    }
}

fn map_story(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    let raw_tags: String = row.get(4)?;
    let tags = serde_json::from_str(&raw_tags).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(StoryRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        thumbnail: row.get(3)?,
        tags,
        privacy: get_enum(row, 5)?,
        is_interactive: row.get(6)?,
        view_count: row.get(7)?,
        created_at: get_time(row, 8)?,
        updated_at: get_time(row, 9)?,
        author: get_author(row, 10)?,
        reaction_count: row.get(14)?,
        comment_count: row.get(15)?,
    })
}

fn query_story(conn: &Connection, id: &str) -> Result<Option<StoryRow>> {
    let sql = format!("{STORY_SELECT} WHERE s.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], map_story).optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;
    use cerita_types::Role;

    fn story<'a>(author_id: &'a str, title: &'a str, privacy: Privacy, tags: &'a [String]) -> NewStory<'a> {
        NewStory {
            author_id,
            title,
            content: "isi cerita",
            thumbnail: None,
            tags,
            privacy,
            is_interactive: false,
        }
    }

    fn filter(viewer_id: Option<&str>) -> StoryListFilter<'_> {
        StoryListFilter {
            viewer_id,
            public_only: false,
            tag: None,
            sort: StorySort::Latest,
            limit: 50,
            offset: 0,
        }
    }

    #[test]
    fn private_stories_only_listed_for_their_author() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@sekolah.id", Role::Student);
        let other = fixtures::user(&db, "other@sekolah.id", Role::Student);
        let teacher = fixtures::user(&db, "guru@sekolah.id", Role::Teacher);

        db.insert_story(&story(&owner.id, "terbuka", Privacy::Public, &[])).unwrap();
        db.insert_story(&story(&owner.id, "anonim", Privacy::Anonymous, &[])).unwrap();
        let secret = db.insert_story(&story(&owner.id, "rahasia", Privacy::Private, &[])).unwrap();

        for viewer in [Some(other.id.as_str()), Some(teacher.id.as_str()), None] {
            let (rows, total) = db.list_stories(&filter(viewer)).unwrap();
            assert_eq!(total, 2);
            assert!(rows.iter().all(|s| s.id != secret.id));
        }

        let (rows, total) = db.list_stories(&filter(Some(&owner.id))).unwrap();
        assert_eq!(total, 3);
        assert!(rows.iter().any(|s| s.id == secret.id));
    }

    #[test]
    fn tag_filter_and_latest_first() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@sekolah.id", Role::Student);
        let sedih = vec!["sedih".to_string()];
        let lain = vec!["lain".to_string()];

        let first = db.insert_story(&story(&owner.id, "satu", Privacy::Public, &sedih)).unwrap();
        db.insert_story(&story(&owner.id, "dua", Privacy::Public, &lain)).unwrap();
        let third = db.insert_story(&story(&owner.id, "tiga", Privacy::Public, &sedih)).unwrap();

        let mut f = filter(None);
        f.tag = Some("sedih");
        let (rows, total) = db.list_stories(&f).unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].id, third.id);
        assert_eq!(rows[1].id, first.id);
        assert_eq!(rows[0].tags, sedih);
    }

    #[test]
    fn popular_sort_uses_view_count() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@sekolah.id", Role::Student);
        let old = db.insert_story(&story(&owner.id, "lama", Privacy::Public, &[])).unwrap();
        db.insert_story(&story(&owner.id, "baru", Privacy::Public, &[])).unwrap();
        db.increment_story_views(&old.id).unwrap();

        let mut f = filter(None);
        f.sort = StorySort::Popular;
        let (rows, _) = db.list_stories(&f).unwrap();
        assert_eq!(rows[0].id, old.id);
        assert_eq!(rows[0].view_count, 1);
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@sekolah.id", Role::Student);
        let created = db.insert_story(&story(&owner.id, "judul", Privacy::Public, &[])).unwrap();

        let updated = db
            .update_story(
                &created.id,
                &StoryPatch {
                    privacy: Some(Privacy::Anonymous),
                    thumbnail: Some(Some("https://cdn/t.png")),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "judul");
        assert_eq!(updated.privacy, Privacy::Anonymous);
        assert_eq!(updated.thumbnail.as_deref(), Some("https://cdn/t.png"));

        assert!(db.delete_story(&created.id).unwrap());
        assert!(db.get_story(&created.id).unwrap().is_none());
        assert!(!db.delete_story(&created.id).unwrap());
    }
}
