use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('SISWA', 'GURU')),
                avatar      TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE stories (
                id              TEXT PRIMARY KEY,
                author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                thumbnail       TEXT,
                tags            TEXT NOT NULL DEFAULT '[]',
                privacy         TEXT NOT NULL DEFAULT 'PUBLIC'
                                CHECK (privacy IN ('PUBLIC', 'ANONYMOUS', 'PRIVATE')),
                is_interactive  INTEGER NOT NULL DEFAULT 0,
                view_count      INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_stories_created ON stories(created_at);

            CREATE TABLE journals (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                privacy     TEXT NOT NULL DEFAULT 'PRIVATE'
                            CHECK (privacy IN ('PUBLIC', 'ANONYMOUS', 'PRIVATE')),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_journals_author ON journals(author_id, created_at);

            CREATE TABLE announcements (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE comments (
                id               TEXT PRIMARY KEY,
                user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                story_id         TEXT REFERENCES stories(id) ON DELETE CASCADE,
                journal_id       TEXT REFERENCES journals(id) ON DELETE CASCADE,
                announcement_id  TEXT REFERENCES announcements(id) ON DELETE CASCADE,
                parent_id        TEXT REFERENCES comments(id) ON DELETE CASCADE,
                content          TEXT NOT NULL,
                is_anonymous     INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL,
                CHECK ((story_id IS NOT NULL)
                     + (journal_id IS NOT NULL)
                     + (announcement_id IS NOT NULL) = 1)
            );

            CREATE INDEX idx_comments_story ON comments(story_id);
            CREATE INDEX idx_comments_journal ON comments(journal_id);
            CREATE INDEX idx_comments_announcement ON comments(announcement_id);
            CREATE INDEX idx_comments_parent ON comments(parent_id);

            CREATE TABLE reactions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                story_id    TEXT NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                type        TEXT NOT NULL CHECK (type IN ('PELUK', 'MENGERTI', 'SEMANGAT')),
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, story_id, type)
            );

            CREATE INDEX idx_reactions_story ON reactions(story_id);

            -- One mood per user per calendar day; the upsert relies on this.
            CREATE TABLE moods (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                type        TEXT NOT NULL
                            CHECK (type IN ('SENANG', 'SEDIH', 'STRES', 'TENANG', 'CEMAS', 'MARAH')),
                note        TEXT,
                mood_date   TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(user_id, mood_date)
            );

            CREATE INDEX idx_moods_date ON moods(mood_date);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn comment_must_target_exactly_one_resource() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "OFF").unwrap();
        run(&conn).unwrap();

        let none = conn.execute(
            "INSERT INTO comments (id, user_id, content, created_at, updated_at)
             VALUES ('c1', 'u1', 'hi', 't', 't')",
            [],
        );
        assert!(none.is_err());

        let two = conn.execute(
            "INSERT INTO comments (id, user_id, story_id, journal_id, content, created_at, updated_at)
             VALUES ('c2', 'u1', 's1', 'j1', 'hi', 't', 't')",
            [],
        );
        assert!(two.is_err());
    }
}
