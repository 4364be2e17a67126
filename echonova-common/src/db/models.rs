//! Document models
//!
//! Identifiers are always canonical here; the representation a row was
//! stored with is resolved when the row is decoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A decoded document together with the row it was read from
///
/// Updates target `rowid` so they hit the record whatever representation its
/// identifier columns use.
#[derive(Debug, Clone)]
pub struct Record<T> {
    pub rowid: i64,
    pub doc: T,
}

/// Audio analysis features of a song
///
/// Unknown keys in stored documents are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeature {
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub speechiness: Option<f64>,
    pub tempo: Option<f64>,
    pub valence: Option<f64>,
}

impl AudioFeature {
    /// Copy with every missing feature set to 0.0, as served to clients
    pub fn filled(&self) -> Self {
        let f = |v: Option<f64>| Some(v.unwrap_or(0.0));
        Self {
            acousticness: f(self.acousticness),
            danceability: f(self.danceability),
            energy: f(self.energy),
            instrumentalness: f(self.instrumentalness),
            liveness: f(self.liveness),
            speechiness: f(self.speechiness),
            tempo: f(self.tempo),
            valence: f(self.valence),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub preference: Vec<String>,
    pub email_otp: Option<String>,
    pub otp_expire: Option<DateTime<Utc>>,
    pub receive_recommendation_emails: bool,
    pub profile_image_url: Option<String>,
}

impl User {
    /// New user with no preferences and recommendation mail switched off
    pub fn new(username: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: crate::ident::generate(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            preference: Vec::new(),
            email_otp: None,
            otp_expire: None,
            receive_recommendation_emails: false,
            profile_image_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub id: Uuid,
    pub track_id: Uuid,
    pub title: String,
    pub artist: String,
    pub genre: Vec<String>,
    pub audio_feature: AudioFeature,
    pub s3_url: String,
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Track keys as supplied by clients
    pub tracks_id: Vec<String>,
}

/// Play history of one track for one user
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub id: Uuid,
    pub user_id: Uuid,
    pub track_id: Uuid,
    pub play_count: i64,
    pub last_played: DateTime<Utc>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnonymousSession {
    pub id: Uuid,
    pub browser_fingerprint: String,
    pub user_id: Option<Uuid>,
}
