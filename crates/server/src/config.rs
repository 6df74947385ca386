use std::net::SocketAddr;

use chrono::FixedOffset;
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SENDER_EMAIL: &str = "noreply@parentjourney.app";
const DEFAULT_SENDER_NAME: &str = "ParentJourney";
const DEFAULT_APP_BASE_URL: &str = "http://localhost:5173";

/// US Eastern standard time, in minutes east of UTC.
pub const DEFAULT_SCHEDULER_UTC_OFFSET_MINUTES: i32 = -300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    Missing(&'static str),
    #[error("environment variable `{name}` is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: Option<SecretString>,
    pub sender_email: String,
    pub sender_name: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub utc_offset: FixedOffset,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub jwt_secret: SecretString,
    pub app_base_url: String,
    pub mail: MailConfig,
    pub llm: LlmConfig,
    pub scheduler: SchedulerSettings,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = SecretString::from(required("PJ_JWT_SECRET")?);

        let listen_addr = optional("PJ_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "PJ_LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        let app_base_url =
            optional("PJ_APP_BASE_URL").unwrap_or_else(|| DEFAULT_APP_BASE_URL.to_string());
        url::Url::parse(&app_base_url).map_err(|e| ConfigError::Invalid {
            name: "PJ_APP_BASE_URL",
            reason: e.to_string(),
        })?;

        let mail = MailConfig {
            api_key: optional("BREVO_API_KEY").map(SecretString::from),
            sender_email: optional("PJ_MAIL_SENDER_EMAIL")
                .unwrap_or_else(|| DEFAULT_SENDER_EMAIL.to_string()),
            sender_name: optional("PJ_MAIL_SENDER_NAME")
                .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
        };

        let llm = LlmConfig {
            api_key: optional("OPENAI_API_KEY").map(SecretString::from),
            model: optional("PJ_OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        };

        let scheduler = SchedulerSettings {
            enabled: optional("PJ_SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            utc_offset: scheduler_offset()?,
        };

        Ok(Self {
            database_url,
            listen_addr,
            jwt_secret,
            app_base_url,
            mail,
            llm,
            scheduler,
        })
    }
}

/// Reads `PJ_SCHEDULER_UTC_OFFSET_MINUTES`, the fixed timezone reminders are matched in.
pub fn scheduler_offset() -> Result<FixedOffset, ConfigError> {
    let minutes = match optional("PJ_SCHEDULER_UTC_OFFSET_MINUTES") {
        Some(raw) => raw.parse::<i32>().map_err(|e| ConfigError::Invalid {
            name: "PJ_SCHEDULER_UTC_OFFSET_MINUTES",
            reason: e.to_string(),
        })?,
        None => DEFAULT_SCHEDULER_UTC_OFFSET_MINUTES,
    };

    FixedOffset::east_opt(minutes * 60).ok_or(ConfigError::Invalid {
        name: "PJ_SCHEDULER_UTC_OFFSET_MINUTES",
        reason: format!("{minutes} minutes is out of range"),
    })
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
