use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::Row;

use cerita_types::ReactionType;

use super::{OptionalExt, get_enum, get_time};
use crate::models::ReactionRow;
use crate::{Database, new_id, timestamp};

pub enum ReactionToggle {
    Added(ReactionRow),
    Removed,
}

impl Database {
    /// Toggle a reaction: removes the (user, story, type) triple if present,
    /// inserts it otherwise. Other types the user holds on the story are untouched.
    pub fn toggle_reaction(&self, story_id: &str, user_id: &str, kind: ReactionType) -> Result<ReactionToggle> {
        let id = new_id();
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM reactions WHERE user_id = ?1 AND story_id = ?2 AND type = ?3",
                rusqlite::params![user_id, story_id, kind.as_str()],
            )?;
            if removed > 0 {
                return Ok(ReactionToggle::Removed);
            }

            conn.execute(
                "INSERT INTO reactions (id, user_id, story_id, type, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_id, story_id, kind.as_str(), now],
            )?;
            let row = conn
                .query_row(
                    "SELECT id, story_id, user_id, type, created_at FROM reactions WHERE id = ?1",
                    [&id],
                    map_reaction,
                )
                .optional()?
                .ok_or_else(|| anyhow!("Reaction vanished after insert: {}", id))?;
            Ok(ReactionToggle::Added(row))
        })
    }

    pub fn reactions_for_story(&self, story_id: &str) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, story_id, user_id, type, created_at
                 FROM reactions WHERE story_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([story_id], map_reaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_reaction(row: &Row<'_>) -> rusqlite::Result<ReactionRow> {
    Ok(ReactionRow {
        id: row.get(0)?,
        story_id: row.get(1)?,
        user_id: row.get(2)?,
        kind: get_enum(row, 3)?,
        created_at: get_time(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewStory;
    use crate::queries::fixtures;
    use cerita_types::{Privacy, Role};

    fn story_id(db: &Database, author_id: &str) -> String {
        db.insert_story(&NewStory {
            author_id,
            title: "judul",
            content: "isi",
            thumbnail: None,
            tags: &[],
            privacy: Privacy::Public,
            is_interactive: false,
        })
        .unwrap()
        .id
    }

    #[test]
    fn same_triple_toggles_presence() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "siswa@sekolah.id", Role::Student);
        let story = story_id(&db, &user.id);

        assert!(db.reactions_for_story(&story).unwrap().is_empty());
        assert!(matches!(
            db.toggle_reaction(&story, &user.id, ReactionType::Hug).unwrap(),
            ReactionToggle::Added(_)
        ));
        assert_eq!(db.reactions_for_story(&story).unwrap().len(), 1);
        assert!(matches!(
            db.toggle_reaction(&story, &user.id, ReactionType::Hug).unwrap(),
            ReactionToggle::Removed
        ));
        assert!(db.reactions_for_story(&story).unwrap().is_empty());
    }

    #[test]
    fn different_types_coexist() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "siswa@sekolah.id", Role::Student);
        let story = story_id(&db, &user.id);

        db.toggle_reaction(&story, &user.id, ReactionType::Hug).unwrap();
        db.toggle_reaction(&story, &user.id, ReactionType::Cheer).unwrap();

        let kinds: Vec<_> = db.reactions_for_story(&story).unwrap().into_iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ReactionType::Hug, ReactionType::Cheer]);
        assert_eq!(db.get_story(&story).unwrap().unwrap().reaction_count, 2);
    }
}
