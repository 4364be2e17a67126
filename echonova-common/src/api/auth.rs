//! Bearer token issuance and validation
//!
//! # Token Format
//!
//! `<payload>.<signature>` where:
//! - payload is the claims object as canonical JSON, base64url (no padding)
//! - signature is SHA-256 over canonical JSON followed by the shared secret,
//!   as 64 hex characters
//!
//! Canonical JSON has sorted keys and no whitespace, so the signature does not
//! depend on how the claims were serialized.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::password::constant_time_eq;
use crate::config::AuthConfig;

// ========================================
// Types
// ========================================

/// Claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Canonical identifier of the user or admin
    pub sub: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub iss: String,
    pub aud: String,
    /// Expiry as Unix epoch seconds
    pub exp: i64,
}

impl Claims {
    /// Build claims that expire `config.expiration_minutes` after `now`
    pub fn new(sub: Uuid, email: &str, is_admin: bool, config: &AuthConfig, now: i64) -> Self {
        Self {
            sub,
            email: email.to_string(),
            is_admin,
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            exp: now + config.expiration_minutes * 60,
        }
    }
}

/// Token validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not `<payload>.<signature>` or payload not decodable
    Malformed(String),

    /// Signature does not match the payload
    InvalidSignature,

    /// Token expired
    Expired { exp: i64, now: i64 },

    /// Issuer or audience does not match this service
    WrongIssuer(String),
    WrongAudience(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed(reason) => write!(f, "Malformed token: {}", reason),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Expired { exp, now } => {
                write!(f, "Token expired {}s ago", now - exp)
            }
            TokenError::WrongIssuer(iss) => write!(f, "Unexpected issuer: {}", iss),
            TokenError::WrongAudience(aud) => write!(f, "Unexpected audience: {}", aud),
        }
    }
}

impl std::error::Error for TokenError {}

// ========================================
// Signing
// ========================================

/// Calculate the token signature for a claims value
///
/// # Examples
///
/// ```
/// use echonova_common::api::auth::calculate_signature;
/// use serde_json::json;
///
/// let sig = calculate_signature(&json!({"sub": "a", "exp": 1}), "secret");
/// assert_eq!(sig.len(), 64);
/// ```
pub fn calculate_signature(claims: &Value, secret: &str) -> String {
    let canonical = to_canonical_json(claims);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert JSON to canonical form (sorted keys, no whitespace)
///
/// # Examples
///
/// ```
/// use echonova_common::api::auth::to_canonical_json;
/// use serde_json::json;
///
/// let canonical = to_canonical_json(&json!({"z": 3, "a": 1}));
/// assert_eq!(canonical, r#"{"a":1,"z":3}"#);
/// ```
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        // serde_json's own rendering escapes strings correctly
        other => other.to_string(),
    }
}

/// Issue a signed bearer token
pub fn issue_token(claims: &Claims, secret: &str) -> String {
    // Claims always serialize to an object; Null only if serde_json itself breaks
    let value = serde_json::to_value(claims).unwrap_or(Value::Null);
    let payload = URL_SAFE_NO_PAD.encode(to_canonical_json(&value));
    let signature = calculate_signature(&value, secret);
    format!("{}.{}", payload, signature)
}

/// Validate a bearer token and return its claims
///
/// Checks, in order: shape, signature, expiry (`now` in Unix seconds),
/// issuer and audience.
pub fn validate_token(
    token: &str,
    config: &AuthConfig,
    now: i64,
) -> Result<Claims, TokenError> {
    let (payload, signature) = token
        .split_once('.')
        .ok_or_else(|| TokenError::Malformed("missing signature".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))?;

    let expected = calculate_signature(&value, &config.secret);
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return Err(TokenError::InvalidSignature);
    }

    let claims: Claims =
        serde_json::from_value(value).map_err(|e| TokenError::Malformed(e.to_string()))?;

    if claims.exp <= now {
        return Err(TokenError::Expired {
            exp: claims.exp,
            now,
        });
    }
    if claims.iss != config.issuer {
        return Err(TokenError::WrongIssuer(claims.iss));
    }
    if claims.aud != config.audience {
        return Err(TokenError::WrongAudience(claims.aud));
    }

    Ok(claims)
}

// ========================================
// Tests
// ========================================
