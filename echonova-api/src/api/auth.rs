//! Account endpoints: signup, login and email OTP
//!
//! - POST /auth/signup
//! - POST /auth/login
//! - POST /auth/send-otp
//! - POST /auth/verify-otp

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{Duration, Utc};
use echonova_common::api::{hash_password, issue_token, verify_password, Claims};
use echonova_common::db::User;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::MessageResponse;
use crate::db::{admins, is_unique_violation, users};
use crate::error::{ApiError, ApiResult};
use crate::services::mailer;
use crate::AppState;

/// Minutes an emailed OTP stays valid
pub const OTP_VALIDITY_MINUTES: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub token: String,
    pub is_admin: bool,
}

fn sign(state: &AppState, sub: Uuid, email: &str, is_admin: bool) -> String {
    let auth = &state.config.auth;
    let claims = Claims::new(sub, email, is_admin, auth, Utc::now().timestamp());
    issue_token(&claims, &auth.secret)
}

/// Create a user account (shared by signup and admin user creation)
///
/// A duplicate email yields 409, also when a concurrent insert wins the race.
pub(crate) async fn create_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> ApiResult<User> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".to_string()));
    }
    if users::find_by_email(&state.db, email).await?.is_some() {
        return Err(ApiError::Conflict("Email already registered.".to_string()));
    }

    let user = User::new(username, email, hash_password(password));
    match users::insert(&state.db, &user).await {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Email already registered.".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    info!(user_id = %user.id, "Created user");
    Ok(user)
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = create_user(&state, &request.username, &request.email, &request.password).await?;

    let mailer_handle = state.mailer.clone();
    let welcome = mailer::welcome_message(&user.email, &user.username);
    tokio::spawn(async move {
        if let Err(e) = mailer_handle.send(welcome).await {
            warn!(error = %e, "Welcome mail failed");
        }
    });

    let is_admin = admins::exists_by_email(&state.db, &user.email).await?;
    let token = sign(&state, user.id, &user.email, is_admin);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            email: user.email,
            username: user.username,
            token,
            is_admin,
        }),
    ))
}

/// POST /auth/login
///
/// Administrator accounts take precedence over user accounts with the same
/// email.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid email or password.".to_string());

    if let Some(admin) = admins::find_by_email(&state.db, &request.email).await? {
        if !verify_password(&request.password, &admin.password_hash) {
            return Err(invalid());
        }
        let token = sign(&state, admin.id, &admin.email, true);
        return Ok(Json(AuthResponse {
            user_id: admin.id,
            username: admin.email.clone(),
            email: admin.email,
            token,
            is_admin: true,
        }));
    }

    let user = users::find_by_email(&state.db, &request.email)
        .await?
        .ok_or_else(invalid)?
        .doc;
    if !verify_password(&request.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = sign(&state, user.id, &user.email, false);
    Ok(Json(AuthResponse {
        user_id: user.id,
        email: user.email,
        username: user.username,
        token,
        is_admin: false,
    }))
}

/// POST /auth/send-otp
pub async fn send_otp(
    State(state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let mut record = users::find_by_email(&state.db, &request.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    let otp = generate_otp();
    record.doc.email_otp = Some(otp.clone());
    record.doc.otp_expire = Some(Utc::now() + Duration::minutes(OTP_VALIDITY_MINUTES));
    users::update(&state.db, record.rowid, &record.doc).await?;

    state
        .mailer
        .send(mailer::otp_message(&record.doc.email, &otp))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(MessageResponse::new("OTP sent.")))
}

/// POST /auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let invalid = || ApiError::BadRequest("Invalid or expired OTP.".to_string());

    let mut record = users::find_by_email(&state.db, &request.email)
        .await?
        .ok_or_else(invalid)?;

    if record.doc.email_otp.as_deref() != Some(request.otp.as_str()) {
        return Err(invalid());
    }
    match record.doc.otp_expire {
        Some(expire) if expire > Utc::now() => {}
        _ => return Err(invalid()),
    }

    record.doc.email_otp = None;
    record.doc.otp_expire = None;
    users::update(&state.db, record.rowid, &record.doc).await?;

    Ok(Json(MessageResponse::new("OTP verified.")))
}

/// Six decimal digits, no leading zero
fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Build account routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/send-otp", post(send_otp))
        .route("/auth/verify-otp", post(verify_otp))
}
