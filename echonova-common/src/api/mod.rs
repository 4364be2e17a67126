//! Authentication primitives shared by Echonova services
//!
//! This module contains ONLY pure functions and shared types. Each service
//! wraps them with framework-specific extractors (Axum, etc.).

pub mod auth;
pub mod password;

pub use auth::{
    calculate_signature, issue_token, to_canonical_json, validate_token, Claims, TokenError,
};
pub use password::{constant_time_eq, hash_password, verify_password};
