pub mod announcements;
pub mod comments;
pub mod journals;
pub mod moods;
pub mod reactions;
pub mod stories;
pub mod users;

use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use cerita_types::ParseEnumError;

use crate::models::AuthorRow;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn get_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

/// Reads `id, name, avatar, role` starting at column `start`.
pub(crate) fn get_author(row: &Row<'_>, start: usize) -> rusqlite::Result<AuthorRow> {
    Ok(AuthorRow {
        id: row.get(start)?,
        name: row.get(start + 1)?,
        avatar: row.get(start + 2)?,
        role: get_enum(row, start + 3)?,
    })
}

pub(crate) fn date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use cerita_types::Role;

    use crate::models::UserRow;
    use crate::{Database, NewUser};

    pub fn user(db: &Database, email: &str, role: Role) -> UserRow {
        db.create_user(&NewUser {
            email,
            name: email.split('@').next().unwrap_or(email),
            password_hash: "$argon2id$stub",
            role,
        })
        .unwrap()
    }
}
