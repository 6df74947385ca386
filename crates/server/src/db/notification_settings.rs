use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_REMINDER_TIME: &str = "20:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationSettings {
    pub user_id: Uuid,
    pub daily_reminder: bool,
    /// Local wall-clock time as "HH:MM".
    pub reminder_time: String,
    pub weekly_progress: bool,
    pub notification_email: Option<String>,
    pub browser_notifications: bool,
}

impl NotificationSettings {
    /// What a user gets before ever saving settings: everything off.
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            daily_reminder: false,
            reminder_time: DEFAULT_REMINDER_TIME.to_string(),
            weekly_progress: false,
            notification_email: None,
            browser_notifications: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNotificationSettings {
    #[serde(default)]
    pub daily_reminder: bool,
    #[serde(default = "default_reminder_time")]
    pub reminder_time: String,
    #[serde(default)]
    pub weekly_progress: bool,
    pub notification_email: Option<String>,
    #[serde(default)]
    pub browser_notifications: bool,
}

fn default_reminder_time() -> String {
    DEFAULT_REMINDER_TIME.to_string()
}

impl UpdateNotificationSettings {
    pub fn validate(&self) -> Result<(), NotificationSettingsError> {
        normalize_reminder_time(&self.reminder_time)?;
        if let Some(email) = &self.notification_email
            && !email.trim().is_empty()
            && !email.contains('@')
        {
            return Err(NotificationSettingsError::Invalid(
                "notification_email is not a valid address".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse "H:MM" or "HH:MM" and return the canonical zero-padded "HH:MM".
pub fn normalize_reminder_time(raw: &str) -> Result<String, NotificationSettingsError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| {
            NotificationSettingsError::Invalid(format!("reminder_time `{raw}` is not HH:MM"))
        })
}

/// A user due for a daily reminder, with the address to send it to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReminderRecipient {
    pub user_id: Uuid,
    pub display_name: String,
    pub account_email: String,
    pub notification_email: Option<String>,
}

impl ReminderRecipient {
    /// Explicit notification address wins over the account email.
    pub fn destination(&self) -> &str {
        self.notification_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(&self.account_email)
    }
}

#[derive(Debug, Error)]
pub enum NotificationSettingsError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct NotificationSettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationSettingsRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Stored settings, or the defaults when the user never saved any.
    pub async fn get_or_default(
        &self,
        user_id: Uuid,
    ) -> Result<NotificationSettings, NotificationSettingsError> {
        let settings = sqlx::query_as::<_, NotificationSettings>(
            r#"
            SELECT user_id, daily_reminder, reminder_time, weekly_progress,
                   notification_email, browser_notifications
            FROM user_notification_settings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(settings.unwrap_or_else(|| NotificationSettings::defaults_for(user_id)))
    }

    pub async fn upsert(
        &self,
        user_id: Uuid,
        data: UpdateNotificationSettings,
    ) -> Result<NotificationSettings, NotificationSettingsError> {
        data.validate()?;
        let reminder_time = normalize_reminder_time(&data.reminder_time)?;
        let notification_email = data
            .notification_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        let settings = sqlx::query_as::<_, NotificationSettings>(
            r#"
            INSERT INTO user_notification_settings (
                user_id, daily_reminder, reminder_time, weekly_progress,
                notification_email, browser_notifications
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET daily_reminder        = EXCLUDED.daily_reminder,
                reminder_time         = EXCLUDED.reminder_time,
                weekly_progress       = EXCLUDED.weekly_progress,
                notification_email    = EXCLUDED.notification_email,
                browser_notifications = EXCLUDED.browser_notifications,
                updated_at            = NOW()
            RETURNING user_id, daily_reminder, reminder_time, weekly_progress,
                      notification_email, browser_notifications
            "#,
        )
        .bind(user_id)
        .bind(data.daily_reminder)
        .bind(reminder_time)
        .bind(data.weekly_progress)
        .bind(notification_email)
        .bind(data.browser_notifications)
        .fetch_one(self.pool)
        .await?;

        Ok(settings)
    }

    /// Users with daily reminders on whose reminder time equals `hh_mm`.
    pub async fn select_due_reminders(
        &self,
        hh_mm: &str,
    ) -> Result<Vec<ReminderRecipient>, NotificationSettingsError> {
        let recipients = sqlx::query_as::<_, ReminderRecipient>(
            r#"
            SELECT s.user_id,
                   u.display_name,
                   u.email AS account_email,
                   s.notification_email
            FROM user_notification_settings s
            INNER JOIN users u ON u.id = s.user_id
            WHERE s.daily_reminder
              AND s.reminder_time = $1
            "#,
        )
        .bind(hh_mm)
        .fetch_all(self.pool)
        .await?;

        Ok(recipients)
    }

    pub async fn select_weekly_recipients(
        &self,
    ) -> Result<Vec<ReminderRecipient>, NotificationSettingsError> {
        let recipients = sqlx::query_as::<_, ReminderRecipient>(
            r#"
            SELECT s.user_id,
                   u.display_name,
                   u.email AS account_email,
                   s.notification_email
            FROM user_notification_settings s
            INNER JOIN users u ON u.id = s.user_id
            WHERE s.weekly_progress
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(recipients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(notification_email: Option<&str>) -> ReminderRecipient {
        ReminderRecipient {
            user_id: Uuid::new_v4(),
            display_name: "Alex".to_string(),
            account_email: "alex@example.com".to_string(),
            notification_email: notification_email.map(str::to_string),
        }
    }

    #[test]
    fn test_normalize_reminder_time() {
        assert_eq!(normalize_reminder_time("8:05").unwrap(), "08:05");
        assert_eq!(normalize_reminder_time("20:00").unwrap(), "20:00");
        assert!(normalize_reminder_time("25:00").is_err());
        assert!(normalize_reminder_time("8am").is_err());
    }

    #[test]
    fn test_destination_prefers_notification_email() {
        assert_eq!(recipient(Some("inbox@example.com")).destination(), "inbox@example.com");
        assert_eq!(recipient(None).destination(), "alex@example.com");
        assert_eq!(recipient(Some("  ")).destination(), "alex@example.com");
    }

    #[test]
    fn test_defaults_are_all_off() {
        let defaults = NotificationSettings::defaults_for(Uuid::new_v4());
        assert!(!defaults.daily_reminder);
        assert!(!defaults.weekly_progress);
        assert!(!defaults.browser_notifications);
        assert_eq!(defaults.reminder_time, DEFAULT_REMINDER_TIME);
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let update = UpdateNotificationSettings {
            daily_reminder: true,
            reminder_time: "08:00".to_string(),
            weekly_progress: false,
            notification_email: Some("not-an-email".to_string()),
            browser_notifications: false,
        };
        assert!(update.validate().is_err());
    }
}
