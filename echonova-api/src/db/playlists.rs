//! User playlists

use echonova_common::db::{decode_id, push_id_match, Playlist, Record};
use echonova_common::{ident, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, SqlitePool};
use uuid::Uuid;

use super::{json_column, text_column};

const PLAYLIST_COLUMNS: &str = "rowid, id, user_id, name, tracks_id";

fn playlist_from_row(row: &SqliteRow) -> Result<Record<Playlist>> {
    Ok(Record {
        rowid: row.try_get("rowid")?,
        doc: Playlist {
            id: decode_id(row, "id")?,
            user_id: decode_id(row, "user_id")?,
            name: text_column(row, "name")?,
            tracks_id: json_column(row, "tracks_id")?,
        },
    })
}

pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Playlist>> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM playlists WHERE ", PLAYLIST_COLUMNS));
    push_id_match(&mut qb, "user_id", user_id, None);
    qb.push(" ORDER BY rowid");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(|r| playlist_from_row(r).map(|rec| rec.doc)).collect()
}

/// Playlist `id` if it belongs to `user_id`
pub async fn find_owned(
    pool: &SqlitePool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Record<Playlist>>> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM playlists WHERE ", PLAYLIST_COLUMNS));
    push_id_match(&mut qb, "id", id, None);
    qb.push(" AND ");
    push_id_match(&mut qb, "user_id", user_id, None);
    qb.push(" LIMIT 1");

    let row = qb.build().fetch_optional(pool).await?;
    row.map(|r| playlist_from_row(&r)).transpose()
}

pub async fn insert(pool: &SqlitePool, playlist: &Playlist) -> Result<()> {
    sqlx::query("INSERT INTO playlists (id, user_id, name, tracks_id) VALUES (?, ?, ?, ?)")
        .bind(ident::encode(playlist.id))
        .bind(ident::encode(playlist.user_id))
        .bind(&playlist.name)
        .bind(serde_json::to_string(&playlist.tracks_id)?)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update(pool: &SqlitePool, rowid: i64, playlist: &Playlist) -> Result<()> {
    sqlx::query("UPDATE playlists SET name = ?, tracks_id = ? WHERE rowid = ?")
        .bind(&playlist.name)
        .bind(serde_json::to_string(&playlist.tracks_id)?)
        .bind(rowid)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, rowid: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM playlists WHERE rowid = ?")
        .bind(rowid)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
