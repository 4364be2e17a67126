//! Play history

use chrono::{DateTime, Utc};
use echonova_common::db::{decode_id, push_id_match, History, Record};
use echonova_common::{ident, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, SqlitePool};
use uuid::Uuid;

const HISTORY_COLUMNS: &str =
    "rowid, id, user_id, track_id, play_count, last_played, title, artist";

fn history_from_row(row: &SqliteRow) -> Result<Record<History>> {
    Ok(Record {
        rowid: row.try_get("rowid")?,
        doc: History {
            id: decode_id(row, "id")?,
            user_id: decode_id(row, "user_id")?,
            track_id: decode_id(row, "track_id")?,
            play_count: row.try_get("play_count")?,
            last_played: row.try_get::<DateTime<Utc>, _>("last_played")?,
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
        },
    })
}

/// Entries of one user, most recently played first
pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<History>> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM history WHERE ", HISTORY_COLUMNS));
    push_id_match(&mut qb, "user_id", user_id, None);
    qb.push(" ORDER BY last_played DESC, rowid DESC");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(|r| history_from_row(r).map(|rec| rec.doc)).collect()
}

/// Entry for (`user_id`, `track_id`), where `track_key` is the key the
/// track id was normalized from
pub async fn find(
    pool: &SqlitePool,
    user_id: Uuid,
    track_id: Uuid,
    track_key: &str,
) -> Result<Option<Record<History>>> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM history WHERE ", HISTORY_COLUMNS));
    push_id_match(&mut qb, "user_id", user_id, None);
    qb.push(" AND ");
    push_id_match(&mut qb, "track_id", track_id, Some(track_key));
    qb.push(" ORDER BY rowid");

    let rows = qb.build().fetch_all(pool).await?;
    for row in &rows {
        let record = history_from_row(row)?;
        if record.doc.track_id == track_id {
            return Ok(Some(record));
        }
    }

    // Opaque keys written by older clients only match after normalizing
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM history WHERE ", HISTORY_COLUMNS));
    push_id_match(&mut qb, "user_id", user_id, None);
    qb.push(" AND typeof(track_id) IN ('text', 'integer') ORDER BY rowid");

    let rows = qb.build().fetch_all(pool).await?;
    for row in &rows {
        let record = history_from_row(row)?;
        if record.doc.track_id == track_id {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

pub async fn insert(pool: &SqlitePool, entry: &History) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO history (id, user_id, track_id, play_count, last_played, title, artist)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ident::encode(entry.id))
    .bind(ident::encode(entry.user_id))
    .bind(ident::encode(entry.track_id))
    .bind(entry.play_count)
    .bind(entry.last_played)
    .bind(&entry.title)
    .bind(&entry.artist)
    .execute(pool)
    .await?;
    Ok(())
}

/// Count one more play of the entry at `rowid`
pub async fn record_replay(pool: &SqlitePool, rowid: i64, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE history SET play_count = play_count + 1, last_played = ? WHERE rowid = ?")
        .bind(now)
        .bind(rowid)
        .execute(pool)
        .await?;
    Ok(())
}

/// Canonical track ids of a user's most played tracks
///
/// Ordered by play count, ties broken by most recent play.
pub async fn top_played_track_ids(
    pool: &SqlitePool,
    user_id: Uuid,
    limit: usize,
) -> Result<Vec<Uuid>> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM history WHERE ", HISTORY_COLUMNS));
    push_id_match(&mut qb, "user_id", user_id, None);
    qb.push(" ORDER BY play_count DESC, last_played DESC");

    let rows = qb.build().fetch_all(pool).await?;
    let mut ids = Vec::with_capacity(limit);
    for row in &rows {
        let track_id = history_from_row(row)?.doc.track_id;
        if !ids.contains(&track_id) {
            ids.push(track_id);
        }
        if ids.len() == limit {
            break;
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use echonova_common::db::init_memory_database;

    fn entry(user_id: Uuid, key: &str, plays: i64, last_played: DateTime<Utc>) -> History {
        History {
            id: ident::generate(),
            user_id,
            track_id: ident::normalize_text(key),
            play_count: plays,
            last_played,
            title: None,
            artist: None,
        }
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let pool = init_memory_database().await.unwrap();
        let user = ident::generate();
        let now = Utc::now();
        insert(&pool, &entry(user, "a", 1, now - Duration::hours(2))).await.unwrap();
        insert(&pool, &entry(user, "b", 1, now)).await.unwrap();
        insert(&pool, &entry(ident::generate(), "c", 1, now)).await.unwrap();

        let list = list_for_user(&pool, user).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].track_id, ident::normalize_text("b"));
    }

    #[tokio::test]
    async fn test_replay_increments_count() {
        let pool = init_memory_database().await.unwrap();
        let user = ident::generate();
        insert(&pool, &entry(user, "829", 1, Utc::now())).await.unwrap();

        let track = ident::normalize_text("829");
        let record = find(&pool, user, track, "829").await.unwrap().unwrap();
        record_replay(&pool, record.rowid, Utc::now()).await.unwrap();

        let reread = find(&pool, user, track, "829").await.unwrap().unwrap();
        assert_eq!(reread.doc.play_count, 2);
    }

    #[tokio::test]
    async fn test_top_played_orders_by_count_then_recency() {
        let pool = init_memory_database().await.unwrap();
        let user = ident::generate();
        let now = Utc::now();
        insert(&pool, &entry(user, "low", 1, now)).await.unwrap();
        insert(&pool, &entry(user, "old-tie", 5, now - Duration::days(1))).await.unwrap();
        insert(&pool, &entry(user, "new-tie", 5, now)).await.unwrap();
        insert(&pool, &entry(user, "top", 9, now - Duration::days(3))).await.unwrap();

        let top = top_played_track_ids(&pool, user, 3).await.unwrap();
        assert_eq!(
            top,
            vec![
                ident::normalize_text("top"),
                ident::normalize_text("new-tie"),
                ident::normalize_text("old-tie"),
            ]
        );
    }
}
