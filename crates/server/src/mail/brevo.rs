use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::{EmailMessage, MailError, Mailer};

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct BrevoMailer {
    http: reqwest::Client,
    api_key: SecretString,
    sender: Contact,
}

#[derive(Debug, Clone, Serialize)]
struct Contact {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    sender: &'a Contact,
    to: [Contact; 1],
    subject: &'a str,
    text_content: &'a str,
    html_content: &'a str,
}

impl BrevoMailer {
    pub fn new(
        api_key: SecretString,
        sender_email: String,
        sender_name: String,
    ) -> Result<Self, MailError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            sender: Contact {
                email: sender_email,
                name: Some(sender_name),
            },
        })
    }

    fn request_body<'a>(&'a self, message: &'a EmailMessage) -> SendRequest<'a> {
        SendRequest {
            sender: &self.sender,
            to: [Contact {
                email: message.to_email.clone(),
                name: message.to_name.clone(),
            }],
            subject: &message.subject,
            text_content: &message.text,
            html_content: &message.html,
        }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let response = self
            .http
            .post(BREVO_SEND_URL)
            .header("api-key", self.api_key.expose_secret())
            .json(&self.request_body(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %message.to_email, "email accepted by provider");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let mailer = BrevoMailer::new(
            SecretString::from("key"),
            "noreply@example.com".to_string(),
            "ParentJourney".to_string(),
        )
        .unwrap();
        let message = EmailMessage {
            to_email: "sam@example.com".to_string(),
            to_name: Some("Sam".to_string()),
            subject: "Hello".to_string(),
            text: "plain".to_string(),
            html: "<p>html</p>".to_string(),
        };

        let body = serde_json::to_value(mailer.request_body(&message)).unwrap();
        assert_eq!(body["sender"]["email"], "noreply@example.com");
        assert_eq!(body["to"][0]["email"], "sam@example.com");
        assert_eq!(body["to"][0]["name"], "Sam");
        assert_eq!(body["textContent"], "plain");
        assert_eq!(body["htmlContent"], "<p>html</p>");
    }
}
