//! Shared helpers for echonova-api integration tests

#![allow(dead_code)]

use axum::{
    async_trait,
    body::Body,
    extract::Multipart,
    http::{header, Request, StatusCode},
    routing::post,
    Json, Router,
};
use echonova_api::services::{MailError, MailMessage, Mailer};
use echonova_api::{build_router, AppState};
use echonova_common::api::hash_password;
use echonova_common::config::{Config, MlConfig};
use echonova_common::db::{init_memory_database, Admin, AudioFeature};
use echonova_common::ident;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt; // for `oneshot`

pub const ADMIN_EMAIL: &str = "admin@echonova.io";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Mailer that keeps every message for inspection
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    pub fn with_subject(&self, subject: &str) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
}

/// App over a fresh in-memory database; ML services point at closed ports
pub async fn spawn_app() -> TestApp {
    spawn_app_with_ml(MlConfig {
        facial_api_base_url: "http://127.0.0.1:1".to_string(),
        music_rec_api_base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 5,
    })
    .await
}

pub async fn spawn_app_with_ml(ml: MlConfig) -> TestApp {
    let db = init_memory_database().await.unwrap();
    let mut config = Config::default();
    config.auth.secret = "integration-test-secret".to_string();
    config.ml = ml;

    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(db.clone(), config, mailer.clone()).unwrap();

    TestApp {
        app: build_router(state),
        db,
        mailer,
    }
}

impl TestApp {
    /// Send a JSON request; returns status and parsed body (Null when empty)
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let request = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    /// Sign up and return the bearer token
    pub async fn signup(&self, username: &str, email: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/auth/signup",
                None,
                Some(json!({"username": username, "email": email, "password": "pa55word"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Provision an administrator and return its bearer token
    pub async fn admin_token(&self) -> String {
        echonova_api::db::admins::insert(
            &self.db,
            &Admin {
                id: ident::generate(),
                email: ADMIN_EMAIL.to_string(),
                password_hash: hash_password(ADMIN_PASSWORD),
            },
        )
        .await
        .unwrap();

        let (status, body) = self
            .request(
                "POST",
                "/auth/login",
                None,
                Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAdmin"], true);
        body["token"].as_str().unwrap().to_string()
    }

    /// Insert a catalog song with a canonical track id; returns the id text
    pub async fn add_song(&self, title: &str, artist: &str, genre: &[&str]) -> String {
        let track_id = ident::generate();
        sqlx::query(
            "INSERT INTO songs (id, track_id, title, artist, genre, audio_feature, s3_url) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(ident::encode(ident::generate()))
        .bind(ident::encode(track_id))
        .bind(title)
        .bind(artist)
        .bind(serde_json::to_string(genre).unwrap())
        .bind(serde_json::to_string(&AudioFeature::default()).unwrap())
        .bind(format!("https://cdn.example/{}.mp3", title))
        .execute(&self.db)
        .await
        .unwrap();
        ident::encode(track_id)
    }
}

/// Requests received by the mock ML server
#[derive(Default, Clone)]
pub struct MockMlLog {
    pub requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockMlLog {
    pub fn bodies(&self, path: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

/// Stand-in for both ML services on an ephemeral port
///
/// Recommendation endpoints answer with `items`; the emotion endpoint
/// echoes the uploaded file name and size.
pub async fn spawn_mock_ml(items: Value) -> (String, MockMlLog) {
    let log = MockMlLog::default();

    let by_title_log = log.clone();
    let by_title_items = items.clone();
    let multiple_log = log.clone();
    let multiple_items = items;

    let app = Router::new()
        .route(
            "/recommend/by-title",
            post(move |Json(body): Json<Value>| async move {
                by_title_log
                    .requests
                    .lock()
                    .unwrap()
                    .push(("/recommend/by-title".to_string(), body));
                Json(json!({ "items": by_title_items }))
            }),
        )
        .route(
            "/recommend/from-multiple",
            post(move |Json(body): Json<Value>| async move {
                multiple_log
                    .requests
                    .lock()
                    .unwrap()
                    .push(("/recommend/from-multiple".to_string(), body));
                Json(json!({ "items": multiple_items }))
            }),
        )
        .route(
            "/emotion/predict",
            post(|mut multipart: Multipart| async move {
                while let Some(field) = multipart.next_field().await.unwrap() {
                    if field.name() == Some("file") {
                        let content_type = field.content_type().unwrap_or_default().to_string();
                        let filename = field.file_name().unwrap_or_default().to_string();
                        let size = field.bytes().await.unwrap().len();
                        return Json(json!({
                            "filename": filename,
                            "predicted_label": format!("{}:{}", content_type, size),
                            "predicted_index": 3,
                            "probabilities": [0.1, 0.2, 0.3, 0.4],
                            "classes": ["angry", "sad", "neutral", "happy"]
                        }));
                    }
                }
                Json(json!({"detail": "no file"}))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), log)
}

/// multipart/form-data body with a single `file` part
pub fn multipart_request(uri: &str, token: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    const BOUNDARY: &str = "echonova-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
             Content-Type: image/png\r\n\r\n",
            BOUNDARY, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
