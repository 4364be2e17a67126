//! Outgoing mail
//!
//! Handlers build a [`MailMessage`] and hand it to the configured [`Mailer`].
//! The shipped [`LogMailer`] records messages in the log instead of
//! delivering them.

use axum::async_trait;
use thiserror::Error;
use tracing::info;

use echonova_common::config::MailConfig;
use echonova_common::db::Song;

/// Number of songs listed in a recommendation mail
pub const RECOMMENDATION_MAIL_SONGS: usize = 3;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// A rendered HTML message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Mailer that writes each message to the log
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            from: format!("{} <{}>", config.from_name, config.from_address),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            "Mail queued (log only)"
        );
        tracing::debug!(body = %message.html_body, "Mail body");
        Ok(())
    }
}

pub fn otp_message(email: &str, otp: &str) -> MailMessage {
    MailMessage {
        to: email.to_string(),
        subject: "Your verification code".to_string(),
        html_body: format!(
            "<html><body>\n<p>Your Echonova verification code is: <strong>{}</strong></p>\n\
             <p>It expires in 10 minutes.</p>\n</body></html>",
            escape_html(otp)
        ),
    }
}

pub fn welcome_message(email: &str, username: &str) -> MailMessage {
    MailMessage {
        to: email.to_string(),
        subject: "Welcome to Echonova".to_string(),
        html_body: format!(
            "<html><body>\n<p>Hi {},</p>\n\
             <p>Welcome to Echonova! Your account has been created.</p>\n</body></html>",
            escape_html(username)
        ),
    }
}

pub fn recommendation_message(email: &str, username: &str, songs: &[Song]) -> MailMessage {
    let list: String = songs
        .iter()
        .take(RECOMMENDATION_MAIL_SONGS)
        .map(|s| {
            format!(
                "<li><strong>{}</strong> by {} - <a href=\"{}\">Listen</a></li>",
                escape_html(&s.title),
                escape_html(&s.artist),
                escape_html(&s.s3_url)
            )
        })
        .collect();

    MailMessage {
        to: email.to_string(),
        subject: "Your music recommendations".to_string(),
        html_body: format!(
            "<html><body>\n<p>Hi {},</p>\n\
             <p>Here are some songs we think you'll like:</p>\n<ul>{}</ul>\n</body></html>",
            escape_html(username),
            list
        ),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use echonova_common::db::AudioFeature;
    use uuid::Uuid;

    fn song(title: &str) -> Song {
        Song {
            id: Uuid::nil(),
            track_id: Uuid::nil(),
            title: title.to_string(),
            artist: "Artist".to_string(),
            genre: vec![],
            audio_feature: AudioFeature::default(),
            s3_url: "https://cdn/x.mp3".to_string(),
            cover_url: None,
        }
    }

    #[test]
    fn test_otp_message_contains_code() {
        let msg = otp_message("a@b.io", "123456");
        assert_eq!(msg.to, "a@b.io");
        assert!(msg.html_body.contains("<strong>123456</strong>"));
    }

    #[test]
    fn test_welcome_message_escapes_username() {
        let msg = welcome_message("a@b.io", "<b>eve</b>");
        assert!(msg.html_body.contains("&lt;b&gt;eve&lt;/b&gt;"));
        assert!(!msg.html_body.contains("<b>eve"));
    }

    #[test]
    fn test_recommendation_message_lists_at_most_three() {
        let songs: Vec<Song> = ["one", "two", "three", "four"].iter().map(|t| song(t)).collect();
        let msg = recommendation_message("a@b.io", "ann", &songs);
        assert_eq!(msg.html_body.matches("<li>").count(), 3);
        assert!(!msg.html_body.contains("four"));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_messages() {
        let mailer = LogMailer::new(&MailConfig::default());
        mailer.send(otp_message("a@b.io", "000000")).await.unwrap();
    }
}
