use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};

use cerita_types::Role;

use super::{OptionalExt, get_enum, get_time};
use crate::models::UserRow;
use crate::{Database, new_id, timestamp};

pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

/// Fields left as `None` keep their stored value.
#[derive(Default)]
pub struct ProfilePatch<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub avatar: Option<Option<&'a str>>,
}

const USER_COLUMNS: &str = "id, email, name, password, role, avatar, created_at, updated_at";

impl Database {
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow> {
        let id = new_id();
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, password, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, user.email, user.name, user.password_hash, user.role.as_str(), now],
            )?;
            query_user(conn, "id", &id)?.ok_or_else(|| anyhow::anyhow!("User vanished after insert: {}", id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Whether another account already uses `email`.
    pub fn email_taken(&self, email: &str, except_user_id: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2))",
                rusqlite::params![email, except_user_id],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn update_profile(&self, id: &str, patch: &ProfilePatch<'_>) -> Result<Option<UserRow>> {
        let now = timestamp(Utc::now());
        let (set_avatar, avatar) = match patch.avatar {
            Some(value) => (true, value),
            None => (false, None),
        };
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    email = COALESCE(?3, email),
                    avatar = CASE WHEN ?4 THEN ?5 ELSE avatar END,
                    updated_at = ?6
                 WHERE id = ?1",
                rusqlite::params![id, patch.name, patch.email, set_avatar, avatar, now],
            )?;
            query_user(conn, "id", id)
        })
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let now = timestamp(Utc::now());
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, password_hash, now],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn count_students(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = ?1",
                [Role::Student.as_str()],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password: row.get(3)?,
        role: get_enum(row, 4)?,
        avatar: row.get(5)?,
        created_at: get_time(row, 6)?,
        updated_at: get_time(row, 7)?,
    })
}

/// `column` is always one of our own literals, never caller input.
fn query_user(conn: &Connection, column: &'static str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_user).optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use crate::queries::fixtures;

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "sari@sekolah.id", Role::Student);

        let err = db
            .create_user(&NewUser {
                email: "sari@sekolah.id",
                name: "Sari Lagi",
                password_hash: "x",
                role: Role::Student,
            })
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn profile_patch_keeps_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        let user = fixtures::user(&db, "budi@sekolah.id", Role::Teacher);

        let patched = db
            .update_profile(
                &user.id,
                &ProfilePatch {
                    avatar: Some(Some("https://cdn/avatars/b.png")),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(patched.name, "budi");
        assert_eq!(patched.avatar.as_deref(), Some("https://cdn/avatars/b.png"));

        let cleared = db
            .update_profile(
                &user.id,
                &ProfilePatch {
                    name: Some("Pak Budi"),
                    avatar: Some(None),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(cleared.name, "Pak Budi");
        assert_eq!(cleared.avatar, None);
        assert_eq!(cleared.email, "budi@sekolah.id");
    }

    #[test]
    fn email_taken_ignores_own_account() {
        let db = Database::open_in_memory().unwrap();
        let a = fixtures::user(&db, "a@sekolah.id", Role::Student);
        fixtures::user(&db, "b@sekolah.id", Role::Student);

        assert!(!db.email_taken("a@sekolah.id", Some(&a.id)).unwrap());
        assert!(db.email_taken("b@sekolah.id", Some(&a.id)).unwrap());
        assert!(db.email_taken("a@sekolah.id", None).unwrap());
        assert_eq!(db.count_students().unwrap(), 2);
    }
}
