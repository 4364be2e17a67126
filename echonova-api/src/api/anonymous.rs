//! Anonymous browser sessions
//!
//! - POST /anonymous/session

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::sessions;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousSessionRequest {
    #[serde(default)]
    pub browser_fingerprint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousSessionResponse {
    pub session_id: Uuid,
}

/// POST /anonymous/session
///
/// Returns the session already held by the fingerprint, or a new one.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<AnonymousSessionRequest>,
) -> ApiResult<Json<AnonymousSessionResponse>> {
    let fingerprint = request.browser_fingerprint.trim();
    if fingerprint.is_empty() {
        return Err(ApiError::BadRequest("BrowserFingerprint required.".to_string()));
    }

    let session = sessions::get_or_create(&state.db, fingerprint).await?;
    Ok(Json(AnonymousSessionResponse {
        session_id: session.id,
    }))
}

/// Build anonymous session routes
pub fn anonymous_routes() -> Router<AppState> {
    Router::new().route("/anonymous/session", post(create_session))
}
