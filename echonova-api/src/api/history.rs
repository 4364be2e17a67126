//! Play history
//!
//! - GET /history
//! - POST /history, PUT /history: record one play of `trackId`

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use echonova_common::db::History;
use echonova_common::ident;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::AuthUser;
use crate::db::{history, songs};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPlayRequest {
    #[serde(default)]
    pub track_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub track_id: Uuid,
    pub play_count: i64,
    pub last_played: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

impl From<History> for HistoryResponse {
    fn from(h: History) -> Self {
        Self {
            id: h.id,
            user_id: h.user_id,
            track_id: h.track_id,
            play_count: h.play_count,
            last_played: h.last_played,
            title: h.title,
            artist: h.artist,
        }
    }
}

/// GET /history
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<Vec<HistoryResponse>>> {
    let entries = history::list_for_user(&state.db, claims.sub).await?;
    Ok(Json(entries.into_iter().map(HistoryResponse::from).collect()))
}

/// POST|PUT /history
pub async fn record_play(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<RecordPlayRequest>,
) -> ApiResult<Json<HistoryResponse>> {
    let key = request.track_id.trim();
    if key.is_empty() {
        return Err(ApiError::BadRequest("Invalid track_id.".to_string()));
    }

    let track_id = ident::normalize_text(key);
    let now = Utc::now();

    if let Some(mut record) = history::find(&state.db, claims.sub, track_id, key).await? {
        history::record_replay(&state.db, record.rowid, now).await?;
        record.doc.play_count += 1;
        record.doc.last_played = now;
        debug!(track_id = %track_id, plays = record.doc.play_count, "Recorded replay");
        return Ok(Json(record.doc.into()));
    }

    let song = songs::find_by_track_key(&state.db, key).await?.map(|r| r.doc);
    let entry = History {
        id: ident::generate(),
        user_id: claims.sub,
        track_id,
        play_count: 1,
        last_played: now,
        title: song.as_ref().map(|s| s.title.clone()),
        artist: song.map(|s| s.artist),
    };
    history::insert(&state.db, &entry).await?;
    debug!(track_id = %track_id, "Recorded first play");

    Ok(Json(entry.into()))
}

/// Build history routes
pub fn history_routes() -> Router<AppState> {
    Router::new().route(
        "/history",
        get(list_history).post(record_play).put(record_play),
    )
}
