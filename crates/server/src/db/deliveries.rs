//! Send-once ledger for scheduled notifications.
//!
//! A row is claimed before the email goes out, keyed by user, kind and period.
//! Overlapping ticks or a restart inside the same minute find the row taken and
//! skip the send. A failed send keeps its row; there is no retry.

use std::fmt;

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    DailyReminder,
    WeeklyProgress,
}

impl DeliveryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryKind::DailyReminder => "daily_reminder",
            DeliveryKind::WeeklyProgress => "weekly_progress",
        }
    }
}

impl fmt::Display for DeliveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct DeliveryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DeliveryRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Returns true if this call claimed the slot, false if it was already taken.
    pub async fn try_claim(
        &self,
        user_id: Uuid,
        kind: DeliveryKind,
        period_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO notification_deliveries (user_id, kind, period_key)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, kind, period_key) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(period_key)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
