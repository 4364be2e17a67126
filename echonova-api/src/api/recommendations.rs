//! Recommendation proxy
//!
//! - GET /recommendations/suggested
//! - POST /recommendations/by-track-id
//! - POST /recommendations/from-multiple
//!
//! Seed tracks are resolved to titles in the local catalog, sent to the
//! recommendation service, and the answers mapped back onto catalog songs.
//! Answers with no catalog counterpart are dropped.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use echonova_common::ident;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{AuthUser, SongResponse};
use crate::db::{history, songs};
use crate::error::{ApiError, ApiResult};
use crate::services::MlRecommendation;
use crate::AppState;

/// Seeds taken from the play history for suggestions
const SUGGESTION_SEEDS: usize = 3;

/// Recommendations requested for suggestions
const SUGGESTION_COUNT: u32 = 10;

const MAX_RECOMMENDATIONS: i64 = 100;

fn default_by_track_n() -> i64 {
    10
}

fn default_from_multiple_n() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByTrackIdRequest {
    #[serde(default)]
    pub track_id: String,
    #[serde(default = "default_by_track_n")]
    pub n: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromMultipleRequest {
    #[serde(default)]
    pub track_ids: Vec<String>,
    #[serde(default = "default_from_multiple_n")]
    pub n: i64,
}

#[derive(Debug, Serialize)]
pub struct RecommendationListResponse {
    pub items: Vec<SongResponse>,
}

fn validate_n(n: i64) -> ApiResult<u32> {
    if !(1..=MAX_RECOMMENDATIONS).contains(&n) {
        return Err(ApiError::BadRequest("N must be between 1 and 100.".to_string()));
    }
    Ok(n as u32)
}

/// Map service answers back onto catalog songs
///
/// Matches on title and artist (ignoring case), then on a track key the
/// service echoed back. Each song appears once.
async fn map_to_songs(state: &AppState, items: Vec<MlRecommendation>) -> ApiResult<Vec<SongResponse>> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for item in items {
        let mut song = songs::find_by_title_and_artist(&state.db, &item.title, &item.artist).await?;
        if song.is_none() {
            if let Some(key) = item.track_id.as_deref().or(item.oid.as_deref()) {
                song = songs::find_by_track_key(&state.db, key).await?.map(|r| r.doc);
            }
        }

        match song {
            Some(s) if seen.insert(s.track_id) => results.push(SongResponse::from(s)),
            Some(_) => {}
            None => tracing::debug!(title = %item.title, artist = %item.artist, "Recommendation not in catalog"),
        }
    }

    Ok(results)
}

async fn recommend_by_track_key(state: &AppState, key: &str, n: u32) -> ApiResult<Vec<SongResponse>> {
    let Some(seed) = songs::find_by_track_key(&state.db, key).await? else {
        return Ok(Vec::new());
    };

    let items = state.ml.recommend_by_title(&seed.doc.title, n).await?;
    map_to_songs(state, items).await
}

async fn recommend_from_track_keys(
    state: &AppState,
    keys: &[String],
    n: u32,
) -> ApiResult<Vec<SongResponse>> {
    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for key in keys {
        if !seen.insert(ident::normalize_text(key)) {
            continue;
        }
        if let Some(record) = songs::find_by_track_key(&state.db, key).await? {
            if !record.doc.title.trim().is_empty() {
                titles.push(record.doc.title);
            }
        }
    }

    if titles.is_empty() {
        return Ok(Vec::new());
    }

    let items = state.ml.recommend_from_multiple(&titles, n).await?;
    map_to_songs(state, items).await
}

/// GET /recommendations/suggested
///
/// Seeds from the caller's most played tracks.
pub async fn suggested(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<RecommendationListResponse>> {
    let seeds: Vec<String> = history::top_played_track_ids(&state.db, claims.sub, SUGGESTION_SEEDS)
        .await?
        .into_iter()
        .map(ident::encode)
        .collect();

    let items = match seeds.as_slice() {
        [] => Vec::new(),
        [only] => recommend_by_track_key(&state, only, SUGGESTION_COUNT).await?,
        many => recommend_from_track_keys(&state, many, SUGGESTION_COUNT).await?,
    };

    Ok(Json(RecommendationListResponse { items }))
}

/// POST /recommendations/by-track-id
pub async fn by_track_id(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Json(request): Json<ByTrackIdRequest>,
) -> ApiResult<Json<RecommendationListResponse>> {
    let n = validate_n(request.n)?;
    let items = recommend_by_track_key(&state, request.track_id.trim(), n).await?;
    Ok(Json(RecommendationListResponse { items }))
}

/// POST /recommendations/from-multiple
pub async fn from_multiple(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Json(request): Json<FromMultipleRequest>,
) -> ApiResult<Json<RecommendationListResponse>> {
    if request.track_ids.is_empty() {
        return Err(ApiError::BadRequest("TrackIds list cannot be empty.".to_string()));
    }
    let n = validate_n(request.n)?;

    let items = recommend_from_track_keys(&state, &request.track_ids, n).await?;
    Ok(Json(RecommendationListResponse { items }))
}

/// Build recommendation routes
pub fn recommendation_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations/suggested", get(suggested))
        .route("/recommendations/by-track-id", post(by_track_id))
        .route("/recommendations/from-multiple", post(from_multiple))
}
