//! Anonymous browser sessions

use echonova_common::db::{decode_id, decode_opt_id, AnonymousSession};
use echonova_common::{ident, Result};
use sqlx::{Row, SqlitePool};

use super::is_unique_violation;

pub async fn find_by_fingerprint(
    pool: &SqlitePool,
    fingerprint: &str,
) -> Result<Option<AnonymousSession>> {
    let row = sqlx::query(
        "SELECT id, browser_fingerprint, user_id FROM anonymous_sessions WHERE browser_fingerprint = ?",
    )
    .bind(fingerprint)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(r) => Ok(Some(AnonymousSession {
            id: decode_id(&r, "id")?,
            browser_fingerprint: r.try_get("browser_fingerprint")?,
            user_id: decode_opt_id(&r, "user_id")?,
        })),
        None => Ok(None),
    }
}

/// Session for `fingerprint`, created on first sight
pub async fn get_or_create(pool: &SqlitePool, fingerprint: &str) -> Result<AnonymousSession> {
    if let Some(existing) = find_by_fingerprint(pool, fingerprint).await? {
        return Ok(existing);
    }

    let session = AnonymousSession {
        id: ident::generate(),
        browser_fingerprint: fingerprint.to_string(),
        user_id: None,
    };
    let inserted = sqlx::query(
        "INSERT INTO anonymous_sessions (id, browser_fingerprint, user_id) VALUES (?, ?, NULL)",
    )
    .bind(ident::encode(session.id))
    .bind(&session.browser_fingerprint)
    .execute(pool)
    .await
    .map_err(echonova_common::Error::from);

    match inserted {
        Ok(_) => {
            tracing::debug!(session_id = %session.id, "Created anonymous session");
            Ok(session)
        }
        // Lost a race with a concurrent request for the same fingerprint
        Err(e) if is_unique_violation(&e) => find_by_fingerprint(pool, fingerprint)
            .await?
            .ok_or_else(|| echonova_common::Error::Internal("Session vanished".to_string())),
        Err(e) => Err(e),
    }
}
