//! Outbound integrations: ML services and mail

pub mod mailer;
pub mod ml_client;

pub use mailer::{LogMailer, MailError, MailMessage, Mailer};
pub use ml_client::{EmotionPrediction, MlClient, MlClientError, MlRecommendation};
