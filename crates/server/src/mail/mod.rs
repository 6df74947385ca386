//! Outbound transactional email.

mod brevo;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use brevo::BrevoMailer;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected message with {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Used when no provider key is configured. Every send is logged and dropped.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::warn!(
            to = %message.to_email,
            subject = %message.subject,
            "BREVO_API_KEY not set; email not sent"
        );
        Ok(())
    }
}

/// Brevo when a key is present, otherwise [`DisabledMailer`].
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.api_key {
        Some(key) => Ok(Arc::new(BrevoMailer::new(
            key.clone(),
            config.sender_email.clone(),
            config.sender_name.clone(),
        )?)),
        None => {
            tracing::warn!("BREVO_API_KEY not set; outbound email disabled");
            Ok(Arc::new(DisabledMailer))
        }
    }
}
