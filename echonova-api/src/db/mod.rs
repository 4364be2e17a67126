//! Repositories over the document store
//!
//! Each module decodes rows into `echonova_common::db` models, normalizing
//! identifier columns on the way, and writes new identifiers in canonical
//! text form.

pub mod admins;
pub mod history;
pub mod playlists;
pub mod sessions;
pub mod songs;
pub mod users;

use echonova_common::Result;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Whether an error is a UNIQUE constraint violation
pub fn is_unique_violation(err: &echonova_common::Error) -> bool {
    matches!(
        err,
        echonova_common::Error::Database(sqlx::Error::Database(e)) if e.is_unique_violation()
    )
}

/// Decode a JSON text column; NULL or blank yields the default value
fn json_column<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let text: Option<String> = row.try_get(column)?;
    match text {
        Some(t) if !t.trim().is_empty() => Ok(serde_json::from_str(&t)?),
        _ => Ok(T::default()),
    }
}

/// Decode an optional text column into an owned string, NULL as empty
fn text_column(row: &SqliteRow, column: &str) -> Result<String> {
    Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
}
