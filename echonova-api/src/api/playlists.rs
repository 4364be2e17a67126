//! Playlists of the authenticated user
//!
//! - GET /playlists, POST /playlists
//! - GET|PATCH|DELETE /playlists/:playlist_id
//! - POST /playlists/:playlist_id/tracks
//! - DELETE /playlists/:playlist_id/tracks/:track_id
//!
//! Track keys are kept as supplied; two keys naming the same track (by their
//! normalized identifier) count as one entry.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use echonova_common::db::{Playlist, Record};
use echonova_common::ident;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthUser;
use crate::db::playlists;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub tracks_id: Vec<String>,
}

impl From<Playlist> for PlaylistResponse {
    fn from(p: Playlist) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            name: p.name,
            tracks_id: p.tracks_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    #[serde(default)]
    pub name: String,
    pub tracks_id: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub tracks_id: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTracksRequest {
    #[serde(default)]
    pub track_ids: Vec<String>,
}

fn parse_playlist_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Malformed playlist id: {}", raw)))
}

fn validate_name(name: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("Playlist name must not be blank".to_string()));
    }
    Ok(())
}

/// Append keys not already present (by normalized identifier)
fn add_tracks(tracks: &mut Vec<String>, keys: impl IntoIterator<Item = String>) {
    for key in keys {
        let key = key.trim().to_string();
        if key.is_empty() {
            continue;
        }
        let id = ident::normalize_text(&key);
        if !tracks.iter().any(|t| ident::normalize_text(t) == id) {
            tracks.push(key);
        }
    }
}

async fn load_owned(state: &AppState, raw_id: &str, user_id: Uuid) -> ApiResult<Record<Playlist>> {
    let id = parse_playlist_id(raw_id)?;
    playlists::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Playlist {}", raw_id)))
}

/// GET /playlists
pub async fn list_playlists(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<Vec<PlaylistResponse>>> {
    let list = playlists::list_for_user(&state.db, claims.sub).await?;
    Ok(Json(list.into_iter().map(PlaylistResponse::from).collect()))
}

/// GET /playlists/:playlist_id
pub async fn get_playlist(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(playlist_id): Path<String>,
) -> ApiResult<Json<PlaylistResponse>> {
    let record = load_owned(&state, &playlist_id, claims.sub).await?;
    Ok(Json(record.doc.into()))
}

/// POST /playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<CreatePlaylistRequest>,
) -> ApiResult<(StatusCode, Json<PlaylistResponse>)> {
    validate_name(&request.name)?;

    let mut tracks_id = Vec::new();
    add_tracks(&mut tracks_id, request.tracks_id.unwrap_or_default());

    let playlist = Playlist {
        id: ident::generate(),
        user_id: claims.sub,
        name: request.name,
        tracks_id,
    };
    playlists::insert(&state.db, &playlist).await?;

    Ok((StatusCode::CREATED, Json(playlist.into())))
}

/// PATCH /playlists/:playlist_id
///
/// A supplied `tracksId` replaces the track list.
pub async fn update_playlist(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(playlist_id): Path<String>,
    Json(request): Json<UpdatePlaylistRequest>,
) -> ApiResult<Json<PlaylistResponse>> {
    let mut record = load_owned(&state, &playlist_id, claims.sub).await?;

    if let Some(name) = request.name {
        validate_name(&name)?;
        record.doc.name = name;
    }
    if let Some(tracks) = request.tracks_id {
        record.doc.tracks_id.clear();
        add_tracks(&mut record.doc.tracks_id, tracks);
    }

    playlists::update(&state.db, record.rowid, &record.doc).await?;
    Ok(Json(record.doc.into()))
}

/// DELETE /playlists/:playlist_id
pub async fn delete_playlist(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(playlist_id): Path<String>,
) -> ApiResult<StatusCode> {
    let record = load_owned(&state, &playlist_id, claims.sub).await?;
    playlists::delete(&state.db, record.rowid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /playlists/:playlist_id/tracks
pub async fn add_playlist_tracks(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(playlist_id): Path<String>,
    Json(request): Json<AddTracksRequest>,
) -> ApiResult<Json<PlaylistResponse>> {
    let mut record = load_owned(&state, &playlist_id, claims.sub).await?;
    add_tracks(&mut record.doc.tracks_id, request.track_ids);
    playlists::update(&state.db, record.rowid, &record.doc).await?;
    Ok(Json(record.doc.into()))
}

/// DELETE /playlists/:playlist_id/tracks/:track_id
///
/// Removes every entry naming the track.
pub async fn remove_playlist_track(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path((playlist_id, track_id)): Path<(String, String)>,
) -> ApiResult<Json<PlaylistResponse>> {
    let mut record = load_owned(&state, &playlist_id, claims.sub).await?;

    let id = ident::normalize_text(track_id.trim());
    record.doc.tracks_id.retain(|t| ident::normalize_text(t) != id);

    playlists::update(&state.db, record.rowid, &record.doc).await?;
    Ok(Json(record.doc.into()))
}

/// Build playlist routes
pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/playlists", get(list_playlists).post(create_playlist))
        .route(
            "/playlists/:playlist_id",
            get(get_playlist).patch(update_playlist).delete(delete_playlist),
        )
        .route("/playlists/:playlist_id/tracks", post(add_playlist_tracks))
        .route(
            "/playlists/:playlist_id/tracks/:track_id",
            delete(remove_playlist_track),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_tracks_has_set_semantics() {
        let mut tracks = vec!["829".to_string()];
        add_tracks(
            &mut tracks,
            vec![
                "829".to_string(),
                "dad178ce-4c25-4308-eb23-951ae077ff5f".to_string(),
                " 7762 ".to_string(),
                "".to_string(),
                "7762".to_string(),
            ],
        );
        assert_eq!(tracks, vec!["829", "7762"]);
    }

    #[test]
    fn test_parse_playlist_id() {
        assert!(parse_playlist_id("771f7f50-f8bc-d76c-9943-901100000000").is_ok());
        assert!(parse_playlist_id("not-an-id").is_err());
    }
}
