//! Song catalog queries

use echonova_common::db::{decode_id, push_id_match, AudioFeature, Record, Song};
use echonova_common::{ident, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

use super::{json_column, text_column};

/// Keys matched per statement; each key binds up to seven parameters
const KEYS_PER_QUERY: usize = 100;

const SONG_COLUMNS: &str =
    "rowid, id, track_id, title, artist, genre, audio_feature, s3_url, cover_url";

/// Catalog filter for listings
#[derive(Debug, Clone, Copy, Default)]
pub struct SongFilter<'a> {
    /// Exact genre membership
    pub genre: Option<&'a str>,
    /// Case-insensitive substring of title or artist
    pub search: Option<&'a str>,
}

fn song_from_row(row: &SqliteRow) -> Result<Record<Song>> {
    Ok(Record {
        rowid: row.try_get("rowid")?,
        doc: Song {
            id: decode_id(row, "id")?,
            track_id: decode_id(row, "track_id")?,
            title: text_column(row, "title")?,
            artist: text_column(row, "artist")?,
            genre: json_column(row, "genre")?,
            audio_feature: json_column::<AudioFeature>(row, "audio_feature")?,
            s3_url: text_column(row, "s3_url")?,
            cover_url: row.try_get("cover_url")?,
        },
    })
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SongFilter<'_>) {
    qb.push(" WHERE 1 = 1");
    if let Some(genre) = filter.genre.filter(|g| !g.trim().is_empty()) {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(songs.genre) WHERE json_each.value = ")
            .push_bind(genre.to_string())
            .push(")");
    }
    if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR artist LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One page of songs matching `filter`, plus the total match count
pub async fn list(
    pool: &SqlitePool,
    filter: &SongFilter<'_>,
    offset: i64,
    limit: i64,
) -> Result<(Vec<Song>, i64)> {
    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM songs");
    push_filter(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM songs", SONG_COLUMNS));
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY rowid LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    let songs = rows
        .iter()
        .map(|r| song_from_row(r).map(|rec| rec.doc))
        .collect::<Result<Vec<_>>>()?;

    Ok((songs, total))
}

/// Every song in the catalog
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!("SELECT {} FROM songs ORDER BY rowid", SONG_COLUMNS))
        .fetch_all(pool)
        .await?;
    rows.iter().map(|r| song_from_row(r).map(|rec| rec.doc)).collect()
}

/// Songs whose track key is stored as text or integer and normalizes into `ids`
///
/// Opaque keys are stored as written, so a lookup by their digest has to
/// normalize every candidate row.
async fn scan_opaque_keys(pool: &SqlitePool, ids: &HashSet<Uuid>) -> Result<Vec<Record<Song>>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM songs WHERE typeof(track_id) IN ('text', 'integer') ORDER BY rowid",
        SONG_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let mut found = Vec::new();
    for row in &rows {
        let record = song_from_row(row)?;
        if ids.contains(&record.doc.track_id) {
            found.push(record);
        }
    }
    Ok(found)
}

/// Look up a song by a client-supplied track key in any accepted encoding
pub async fn find_by_track_key(pool: &SqlitePool, key: &str) -> Result<Option<Record<Song>>> {
    let id = ident::normalize_text(key);
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM songs WHERE ", SONG_COLUMNS));
    push_id_match(&mut qb, "track_id", id, Some(key));
    qb.push(" ORDER BY rowid");

    let rows = qb.build().fetch_all(pool).await?;
    for row in &rows {
        let record = song_from_row(row)?;
        if record.doc.track_id == id {
            return Ok(Some(record));
        }
    }

    if key.is_empty() {
        return Ok(None);
    }
    let wanted = HashSet::from([id]);
    Ok(scan_opaque_keys(pool, &wanted).await?.into_iter().next())
}

/// Songs for a set of track keys; unknown keys are skipped
pub async fn find_by_track_keys(pool: &SqlitePool, keys: &[String]) -> Result<Vec<Song>> {
    let mut seen = HashSet::new();
    let wanted: Vec<(Uuid, &str)> = keys
        .iter()
        .map(|k| (ident::normalize_text(k), k.as_str()))
        .filter(|(id, key)| !key.is_empty() && seen.insert(*id))
        .collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    let mut missing = seen;
    for chunk in wanted.chunks(KEYS_PER_QUERY) {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM songs WHERE ", SONG_COLUMNS));
        for (i, (id, key)) in chunk.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            push_id_match(&mut qb, "track_id", *id, Some(*key));
        }

        let rows = qb.build().fetch_all(pool).await?;
        for row in &rows {
            let record = song_from_row(row)?;
            if missing.remove(&record.doc.track_id) {
                records.push(record);
            }
        }
    }

    if !missing.is_empty() {
        records.extend(scan_opaque_keys(pool, &missing).await?);
    }
    records.sort_by_key(|r| r.rowid);
    Ok(records.into_iter().map(|r| r.doc).collect())
}

/// First song whose title and artist match, ignoring case
pub async fn find_by_title_and_artist(
    pool: &SqlitePool,
    title: &str,
    artist: &str,
) -> Result<Option<Song>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM songs WHERE lower(title) = lower(?) AND lower(artist) = lower(?) \
         ORDER BY rowid LIMIT 1",
        SONG_COLUMNS
    ))
    .bind(title)
    .bind(artist)
    .fetch_optional(pool)
    .await?;

    row.map(|r| song_from_row(&r).map(|rec| rec.doc)).transpose()
}

pub async fn insert(pool: &SqlitePool, song: &Song) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (id, track_id, title, artist, genre, audio_feature, s3_url, cover_url)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ident::encode(song.id))
    .bind(ident::encode(song.track_id))
    .bind(&song.title)
    .bind(&song.artist)
    .bind(serde_json::to_string(&song.genre)?)
    .bind(serde_json::to_string(&song.audio_feature)?)
    .bind(&song.s3_url)
    .bind(&song.cover_url)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the mutable fields of the song stored at `rowid`
pub async fn update(pool: &SqlitePool, rowid: i64, song: &Song) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE songs
        SET title = ?, artist = ?, genre = ?, audio_feature = ?, s3_url = ?, cover_url = ?
        WHERE rowid = ?
        "#,
    )
    .bind(&song.title)
    .bind(&song.artist)
    .bind(serde_json::to_string(&song.genre)?)
    .bind(serde_json::to_string(&song.audio_feature)?)
    .bind(&song.s3_url)
    .bind(&song.cover_url)
    .bind(rowid)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, rowid: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM songs WHERE rowid = ?")
        .bind(rowid)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
