//! Public song catalog
//!
//! - GET /songs?genre=&search=&page=&pageSize=
//! - GET /songs/:track_id
//! - POST /songs/by-ids

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use echonova_common::db::{AudioFeature, Song};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::songs::{self, SongFilter};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, Page};
use crate::AppState;

/// Song as served to clients; missing audio features read as 0.0
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongResponse {
    pub id: Uuid,
    pub track_id: Uuid,
    pub title: String,
    pub artist: String,
    pub genre: Vec<String>,
    pub audio_feature: AudioFeature,
    pub s3_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl From<Song> for SongResponse {
    fn from(song: Song) -> Self {
        Self {
            id: song.id,
            track_id: song.track_id,
            audio_feature: song.audio_feature.filled(),
            title: song.title,
            artist: song.artist,
            genre: song.genre,
            s3_url: song.s3_url,
            cover_url: song.cover_url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongListQuery {
    pub genre: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /songs
pub async fn list_songs(
    State(state): State<AppState>,
    Query(query): Query<SongListQuery>,
) -> ApiResult<Json<Page<SongResponse>>> {
    let paging = calculate_pagination(query.page, query.page_size);
    let filter = SongFilter {
        genre: query.genre.as_deref(),
        search: query.search.as_deref(),
    };

    let (items, total) = songs::list(&state.db, &filter, paging.offset, paging.page_size).await?;

    Ok(Json(Page {
        items: items.into_iter().map(SongResponse::from).collect(),
        total,
    }))
}

/// GET /songs/:track_id
///
/// The track id may be in any accepted encoding.
pub async fn get_song(
    State(state): State<AppState>,
    Path(track_id): Path<String>,
) -> ApiResult<Json<SongResponse>> {
    let record = songs::find_by_track_key(&state.db, &track_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {}", track_id)))?;
    Ok(Json(record.doc.into()))
}

/// POST /songs/by-ids
///
/// Body is a JSON array of track keys; an empty or absent body yields `[]`.
pub async fn songs_by_ids(
    State(state): State<AppState>,
    body: Option<Json<Vec<String>>>,
) -> ApiResult<Json<Vec<SongResponse>>> {
    let keys = body.map(|Json(keys)| keys).unwrap_or_default();
    if keys.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let found = songs::find_by_track_keys(&state.db, &keys).await?;
    Ok(Json(found.into_iter().map(SongResponse::from).collect()))
}

/// Build song catalog routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(list_songs))
        .route("/songs/by-ids", post(songs_by_ids))
        .route("/songs/:track_id", get(get_song))
}
