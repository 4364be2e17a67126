//! HTTP API handlers for echonova-api

pub mod admin;
pub mod anonymous;
pub mod auth;
pub mod emotion;
pub mod extract;
pub mod health;
pub mod history;
pub mod playlists;
pub mod recommendations;
pub mod songs;
pub mod users;

pub use admin::admin_routes;
pub use anonymous::anonymous_routes;
pub use auth::auth_routes;
pub use emotion::emotion_routes;
pub use extract::{AdminUser, AuthUser};
pub use health::health_routes;
pub use history::history_routes;
pub use playlists::playlist_routes;
pub use recommendations::recommendation_routes;
pub use songs::{song_routes, SongResponse};
pub use users::{user_routes, UserResponse};

use serde::Serialize;

/// `{"message": ...}` acknowledgement body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
