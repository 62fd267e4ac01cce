use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::Row;

use cerita_types::MoodType;

use super::{date_key, get_date, get_enum, get_time};
use crate::models::MoodRow;
use crate::{Database, new_id, timestamp};

#[derive(Debug)]
pub enum MoodUpsert {
    /// First entry for that day.
    Created(MoodRow),
    /// The day's entry was overwritten.
    Updated(MoodRow),
}

impl MoodUpsert {
    pub fn into_row(self) -> MoodRow {
        match self {
            MoodUpsert::Created(row) | MoodUpsert::Updated(row) => row,
        }
    }
}

const MOOD_COLUMNS: &str = "id, user_id, type, note, mood_date, created_at, updated_at";

impl Database {
    /// Records the user's mood for `day`, replacing an earlier entry for the
    /// same day. One statement, so concurrent submissions cannot both insert.
    pub fn upsert_mood(
        &self,
        user_id: &str,
        day: NaiveDate,
        kind: MoodType,
        note: Option<&str>,
    ) -> Result<MoodUpsert> {
        let id = new_id();
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO moods (id, user_id, type, note, mood_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(user_id, mood_date) DO UPDATE SET
                    type = excluded.type,
                    note = excluded.note,
                    updated_at = excluded.updated_at
                 RETURNING {MOOD_COLUMNS}"
            );
            let row = conn.query_row(
                &sql,
                rusqlite::params![id, user_id, kind.as_str(), note, date_key(day), now],
                map_mood,
            )?;
            // The conflict branch keeps the existing id
            if row.id == id {
                Ok(MoodUpsert::Created(row))
            } else {
                Ok(MoodUpsert::Updated(row))
            }
        })
    }

    pub fn recent_moods(&self, user_id: &str, limit: u32) -> Result<Vec<MoodRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MOOD_COLUMNS} FROM moods WHERE user_id = ?1
                 ORDER BY mood_date DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_mood)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Student mood counts per type on or after `since` (all time when `None`).
    pub fn student_mood_counts(&self, since: Option<NaiveDate>) -> Result<Vec<(MoodType, u64)>> {
        let since = since.map(date_key);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.type, COUNT(*)
                 FROM moods m
                 JOIN users u ON u.id = m.user_id
                 WHERE u.role = 'SISWA' AND (?1 IS NULL OR m.mood_date >= ?1)
                 GROUP BY m.type",
            )?;
            let rows = stmt
                .query_map([since], |row| Ok((get_enum::<MoodType>(row, 0)?, row.get::<_, i64>(1)? as u64)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn students_logged_on(&self, day: NaiveDate) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT m.user_id)
                 FROM moods m
                 JOIN users u ON u.id = m.user_id
                 WHERE u.role = 'SISWA' AND m.mood_date = ?1",
                [date_key(day)],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }
}

fn map_mood(row: &Row<'_>) -> rusqlite::Result<MoodRow> {
    Ok(MoodRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: get_enum(row, 2)?,
        note: row.get(3)?,
        mood_date: get_date(row, 4)?,
        created_at: get_time(row, 5)?,
        updated_at: get_time(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;
    use cerita_types::Role;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn second_submission_same_day_wins() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "siswa@sekolah.id", Role::Student);

        let first = db.upsert_mood(&user.id, day(14), MoodType::Sad, Some("ujian")).unwrap();
        let MoodUpsert::Created(first) = first else {
            panic!("first submission should create the entry");
        };
        let second = db.upsert_mood(&user.id, day(14), MoodType::Happy, None).unwrap();
        let MoodUpsert::Updated(second) = second else {
            panic!("second submission should update the entry");
        };

        assert_eq!(first.id, second.id);
        assert_eq!(second.kind, MoodType::Happy);
        assert_eq!(second.note, None);
        assert_eq!(second.created_at, first.created_at);

        let all = db.recent_moods(&user.id, 10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, MoodType::Happy);
    }

    #[test]
    fn new_day_gets_a_new_row() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "siswa@sekolah.id", Role::Student);

        db.upsert_mood(&user.id, day(13), MoodType::Calm, None).unwrap();
        db.upsert_mood(&user.id, day(14), MoodType::Anxious, None).unwrap();

        let recent = db.recent_moods(&user.id, 1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].mood_date, day(14));
        assert_eq!(db.recent_moods(&user.id, 10).unwrap().len(), 2);
    }

    #[test]
    fn counts_only_students() {
        let db = Database::open_in_memory().unwrap();
        let a = fixtures::user(&db, "a@sekolah.id", Role::Student);
        let b = fixtures::user(&db, "b@sekolah.id", Role::Student);
        let teacher = fixtures::user(&db, "guru@sekolah.id", Role::Teacher);

        db.upsert_mood(&a.id, day(1), MoodType::Sad, None).unwrap();
        db.upsert_mood(&a.id, day(14), MoodType::Happy, None).unwrap();
        db.upsert_mood(&b.id, day(14), MoodType::Happy, None).unwrap();
        db.upsert_mood(&teacher.id, day(14), MoodType::Stressed, None).unwrap();

        let today = db.student_mood_counts(Some(day(14))).unwrap();
        assert_eq!(today, vec![(MoodType::Happy, 2)]);

        let mut all = db.student_mood_counts(None).unwrap();
        all.sort();
        assert_eq!(all, vec![(MoodType::Happy, 2), (MoodType::Sad, 1)]);

        assert_eq!(db.students_logged_on(day(14)).unwrap(), 2);
        assert_eq!(db.students_logged_on(day(2)).unwrap(), 0);
    }
}
