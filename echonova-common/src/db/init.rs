//! Database initialization
//!
//! Identifier columns carry BLOB affinity (`BLOB` declared type) so that rows
//! imported from the legacy store keep their original representation. Nothing
//! keys on them; updates go through `rowid`.

use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Private in-memory database with the full schema
///
/// A single connection that is never recycled, since each SQLite memory
/// connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_admins_table(pool).await?;
    create_songs_table(pool).await?;
    create_playlists_table(pool).await?;
    create_history_table(pool).await?;
    create_anonymous_sessions_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BLOB NOT NULL,
            username TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL DEFAULT '',
            preference TEXT NOT NULL DEFAULT '[]',
            email_otp TEXT,
            otp_expire TIMESTAMP,
            receive_recommendation_emails INTEGER NOT NULL DEFAULT 0,
            profile_image_url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_admins_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id BLOB NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id BLOB NOT NULL,
            track_id BLOB,
            title TEXT NOT NULL DEFAULT '',
            artist TEXT NOT NULL DEFAULT '',
            genre TEXT NOT NULL DEFAULT '[]',
            audio_feature TEXT NOT NULL DEFAULT '{}',
            s3_url TEXT NOT NULL DEFAULT '',
            cover_url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_track_id ON songs(track_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_playlists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id BLOB NOT NULL,
            user_id BLOB NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            tracks_id TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id BLOB NOT NULL,
            user_id BLOB NOT NULL,
            track_id BLOB NOT NULL,
            play_count INTEGER NOT NULL DEFAULT 0,
            last_played TIMESTAMP NOT NULL,
            title TEXT,
            artist TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_user ON history(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_anonymous_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS anonymous_sessions (
            id BLOB NOT NULL,
            browser_fingerprint TEXT NOT NULL UNIQUE,
            user_id BLOB
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
