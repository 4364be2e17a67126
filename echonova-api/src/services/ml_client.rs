//! Clients for the external ML services
//!
//! - Music recommendation: `POST /recommend/by-title` and
//!   `POST /recommend/from-multiple`, both answering `{"items": [...]}`
//! - Facial emotion: `POST /emotion/predict` with a multipart `file` field

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use echonova_common::config::MlConfig;

const USER_AGENT: &str = concat!("echonova-api/", env!("CARGO_PKG_VERSION"));

/// ML client errors
#[derive(Debug, Error)]
pub enum MlClientError {
    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Service returned an error status
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Failed to parse response JSON
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One item returned by the recommendation service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MlRecommendation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(rename = "$oid", default)]
    pub oid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecommendationList {
    #[serde(default)]
    items: Vec<MlRecommendation>,
}

/// Facial emotion prediction as served to clients
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionPrediction {
    #[serde(alias = "filename", default)]
    pub file_name: String,
    #[serde(alias = "predicted_label")]
    pub predicted_label: String,
    #[serde(alias = "predicted_index")]
    pub predicted_index: i64,
    #[serde(default)]
    pub probabilities: Vec<f64>,
    #[serde(default)]
    pub classes: Vec<String>,
}

/// HTTP client for both ML services
#[derive(Debug, Clone)]
pub struct MlClient {
    http_client: reqwest::Client,
    facial_base_url: String,
    music_rec_base_url: String,
}

impl MlClient {
    pub fn new(config: &MlConfig) -> Result<Self, MlClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MlClientError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            facial_base_url: config.facial_api_base_url.trim_end_matches('/').to_string(),
            music_rec_base_url: config.music_rec_api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Recommendations similar to one song title
    pub async fn recommend_by_title(
        &self,
        title: &str,
        n: u32,
    ) -> Result<Vec<MlRecommendation>, MlClientError> {
        self.recommend("/recommend/by-title", json!({ "title": title, "n": n }))
            .await
    }

    /// Recommendations from the averaged features of several titles
    pub async fn recommend_from_multiple(
        &self,
        titles: &[String],
        n: u32,
    ) -> Result<Vec<MlRecommendation>, MlClientError> {
        self.recommend("/recommend/from-multiple", json!({ "titles": titles, "n": n }))
            .await
    }

    async fn recommend(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<MlRecommendation>, MlClientError> {
        let url = format!("{}{}", self.music_rec_base_url, path);

        tracing::debug!(url = %url, "Querying recommendation service");

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MlClientError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MlClientError::ApiError(status.as_u16(), error_text));
        }

        let list: RecommendationList = response
            .json()
            .await
            .map_err(|e| MlClientError::ParseError(e.to_string()))?;

        tracing::debug!(count = list.items.len(), "Recommendation service answered");

        Ok(list.items)
    }

    /// Forward an image to the facial emotion service
    pub async fn predict_emotion(
        &self,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<EmotionPrediction, MlClientError> {
        let url = format!("{}/emotion/predict", self.facial_base_url);

        let part = multipart::Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")
            .map_err(|e| MlClientError::NetworkError(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MlClientError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MlClientError::ApiError(status.as_u16(), error_text));
        }

        let prediction: EmotionPrediction = response
            .json()
            .await
            .map_err(|e| MlClientError::ParseError(e.to_string()))?;

        tracing::info!(
            file_name = %prediction.file_name,
            label = %prediction.predicted_label,
            "Emotion prediction received"
        );

        Ok(prediction)
    }
}
