//! Administration endpoints (admin claim required)
//!
//! - GET|POST /admin/songs
//! - PUT|DELETE /admin/songs/:track_id
//! - GET|POST /admin/users
//! - POST /admin/recommendations/send-now

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use echonova_common::db::{AudioFeature, Song, User};
use echonova_common::ident;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{AdminUser, SongResponse, UserResponse};
use crate::db::songs::{self, SongFilter};
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{Page, PageQuery};
use crate::services::mailer::{self, RECOMMENDATION_MAIL_SONGS};
use crate::AppState;

/// Minimum number of genre matches before falling back to the whole catalog
const MIN_GENRE_MATCHES: usize = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSongRequest {
    /// Keep an existing catalog key; a new identifier is generated otherwise
    pub track_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub audio_feature: AudioFeature,
    pub s3_url: Option<String>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSongRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<Vec<String>>,
    pub audio_feature: Option<AudioFeature>,
    pub s3_url: Option<String>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SendNowResponse {
    pub message: String,
    pub sent: usize,
}

/// GET /admin/songs
pub async fn list_songs(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<SongResponse>>> {
    let paging = query.pagination();
    let (items, total) = songs::list(
        &state.db,
        &SongFilter::default(),
        paging.offset,
        paging.page_size,
    )
    .await?;

    Ok(Json(Page {
        items: items.into_iter().map(SongResponse::from).collect(),
        total,
    }))
}

/// POST /admin/songs
pub async fn create_song(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Json(request): Json<CreateSongRequest>,
) -> ApiResult<(StatusCode, Json<SongResponse>)> {
    let s3_url = request
        .s3_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("S3Url required for this endpoint.".to_string()))?;

    let track_id = match request.track_id.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => ident::normalize_text(key),
        _ => ident::generate(),
    };

    let song = Song {
        id: ident::generate(),
        track_id,
        title: request.title,
        artist: request.artist,
        genre: request.genre,
        audio_feature: request.audio_feature,
        s3_url,
        cover_url: request.cover_url,
    };
    songs::insert(&state.db, &song).await?;
    info!(admin = %claims.email, track_id = %song.track_id, "Added song");

    Ok((StatusCode::CREATED, Json(song.into())))
}

/// PUT /admin/songs/:track_id
pub async fn update_song(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(track_id): Path<String>,
    Json(request): Json<UpdateSongRequest>,
) -> ApiResult<Json<SongResponse>> {
    let mut record = songs::find_by_track_key(&state.db, &track_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {}", track_id)))?;

    let song = &mut record.doc;
    if let Some(title) = request.title {
        song.title = title;
    }
    if let Some(artist) = request.artist {
        song.artist = artist;
    }
    if let Some(genre) = request.genre {
        song.genre = genre;
    }
    if let Some(audio_feature) = request.audio_feature {
        song.audio_feature = audio_feature;
    }
    if let Some(s3_url) = request.s3_url {
        song.s3_url = s3_url;
    }
    if let Some(cover_url) = request.cover_url {
        song.cover_url = Some(cover_url);
    }

    songs::update(&state.db, record.rowid, &record.doc).await?;
    Ok(Json(record.doc.into()))
}

/// DELETE /admin/songs/:track_id
pub async fn delete_song(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(track_id): Path<String>,
) -> ApiResult<StatusCode> {
    let record = songs::find_by_track_key(&state.db, &track_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {}", track_id)))?;

    songs::delete(&state.db, record.rowid).await?;
    info!(admin = %claims.email, track_id = %record.doc.track_id, "Deleted song");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/users
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let user =
        super::auth::create_user(&state, &request.username, &request.email, &request.password)
            .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let paging = query.pagination();
    let list = users::list(&state.db, paging.offset, paging.page_size).await?;
    Ok(Json(list.into_iter().map(UserResponse::from).collect()))
}

/// Up to three random songs for `user`
///
/// Drawn from songs sharing a preferred genre (ignoring case), or from the
/// whole catalog when fewer than two songs match.
pub fn pick_recommendations<R: rand::Rng + ?Sized>(
    user: &User,
    catalog: &[Song],
    rng: &mut R,
) -> Vec<Song> {
    let preferred: Vec<String> = user.preference.iter().map(|p| p.to_lowercase()).collect();
    let by_genre: Vec<&Song> = catalog
        .iter()
        .filter(|s| s.genre.iter().any(|g| preferred.contains(&g.to_lowercase())))
        .collect();

    let pool: Vec<&Song> = if by_genre.len() >= MIN_GENRE_MATCHES {
        by_genre
    } else {
        catalog.iter().collect()
    };

    pool.choose_multiple(rng, RECOMMENDATION_MAIL_SONGS)
        .map(|s| (*s).clone())
        .collect()
}

/// POST /admin/recommendations/send-now
///
/// Mails every opted-in user a few songs; responds with the number of mails
/// sent.
pub async fn send_recommendations_now(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
) -> ApiResult<Json<SendNowResponse>> {
    let subscribers = users::list_recommendation_subscribers(&state.db).await?;
    let catalog = songs::list_all(&state.db).await?;

    let mut sent = 0;
    for user in &subscribers {
        let picks = pick_recommendations(user, &catalog, &mut rand::thread_rng());
        if picks.is_empty() {
            continue;
        }
        let message = mailer::recommendation_message(&user.email, &user.username, &picks);
        match state.mailer.send(message).await {
            Ok(()) => sent += 1,
            Err(e) => warn!(user_id = %user.id, error = %e, "Recommendation mail failed"),
        }
    }

    info!(admin = %claims.email, sent, "Sent recommendation mails");
    Ok(Json(SendNowResponse {
        message: format!("Sent {} recommendation emails.", sent),
        sent,
    }))
}

/// Build administration routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/songs", get(list_songs).post(create_song))
        .route("/admin/songs/:track_id", put(update_song).delete(delete_song))
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/recommendations/send-now", post(send_recommendations_now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn song(title: &str, genre: &[&str]) -> Song {
        Song {
            id: ident::generate(),
            track_id: ident::generate(),
            title: title.to_string(),
            artist: "A".to_string(),
            genre: genre.iter().map(|g| g.to_string()).collect(),
            audio_feature: AudioFeature::default(),
            s3_url: String::new(),
            cover_url: None,
        }
    }

    fn user(preference: &[&str]) -> User {
        let mut u = User::new("u", "u@example.com", String::new());
        u.preference = preference.iter().map(|p| p.to_string()).collect();
        u
    }

    #[test]
    fn test_picks_from_preferred_genres_ignoring_case() {
        let catalog = vec![
            song("r1", &["Rock"]),
            song("r2", &["rock", "pop"]),
            song("j1", &["jazz"]),
            song("j2", &["jazz"]),
        ];
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let picks = pick_recommendations(&user(&["ROCK"]), &catalog, &mut rng);
            assert_eq!(picks.len(), 2);
            assert!(picks.iter().all(|s| s.title.starts_with('r')));
        }
    }

    #[test]
    fn test_falls_back_to_catalog_with_one_match() {
        let catalog = vec![
            song("r1", &["rock"]),
            song("j1", &["jazz"]),
            song("j2", &["jazz"]),
            song("j3", &["jazz"]),
        ];
        let mut rng = StdRng::seed_from_u64(1);

        let picks = pick_recommendations(&user(&["rock"]), &catalog, &mut rng);
        assert_eq!(picks.len(), 3);
    }

    #[test]
    fn test_empty_catalog_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick_recommendations(&user(&["rock"]), &[], &mut rng).is_empty());
    }
}
