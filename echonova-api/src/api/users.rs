//! Current-user profile
//!
//! - GET /users/me
//! - PATCH /users/me

use axum::{extract::State, routing::get, Json, Router};
use echonova_common::db::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthUser;
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub preference: Vec<String>,
    pub receive_recommendation_emails: bool,
    pub profile_image_url: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            preference: user.preference,
            receive_recommendation_emails: user.receive_recommendation_emails,
            profile_image_url: user.profile_image_url,
        }
    }
}

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    pub username: Option<String>,
    pub preference: Option<Vec<String>>,
    pub receive_recommendation_emails: Option<bool>,
}

/// GET /users/me
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<UserResponse>> {
    let record = users::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    Ok(Json(record.doc.into()))
}

/// PATCH /users/me
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    let mut record = users::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    if let Some(username) = request.username {
        if username.trim().is_empty() {
            return Err(ApiError::BadRequest("Username must not be blank".to_string()));
        }
        record.doc.username = username;
    }
    if let Some(preference) = request.preference {
        record.doc.preference = preference;
    }
    if let Some(receive) = request.receive_recommendation_emails {
        record.doc.receive_recommendation_emails = receive;
    }

    users::update(&state.db, record.rowid, &record.doc).await?;
    Ok(Json(record.doc.into()))
}

/// Build profile routes
pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).patch(update_me))
}
