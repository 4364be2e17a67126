//! Facial emotion proxy
//!
//! - POST /emotion/facial (multipart field `file`)

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};

use super::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::EmotionPrediction;
use crate::AppState;

/// Largest accepted image
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Room for multipart framing around the image
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// POST /emotion/facial
pub async fn predict_facial_emotion(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<EmotionPrediction>> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image.jpg").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if data.is_empty() {
            return Err(ApiError::BadRequest("Image file is required.".to_string()));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::BadRequest("Image file too large.".to_string()));
        }

        let prediction = state.ml.predict_emotion(data.to_vec(), &file_name).await?;
        return Ok(Json(prediction));
    }

    Err(ApiError::BadRequest("Image file is required.".to_string()))
}

/// Build emotion routes
pub fn emotion_routes() -> Router<AppState> {
    Router::new().route(
        "/emotion/facial",
        post(predict_facial_emotion)
            .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD)),
    )
}
