use serde::Serialize;
use sqlx::PgPool;

/// Site-wide counters for the admin dashboard.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminStats {
    pub families: i64,
    pub users: i64,
    pub entries: i64,
    pub entries_last_7_days: i64,
    pub community_posts: i64,
    pub daily_reminders_enabled: i64,
}

pub struct AdminRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn stats(&self) -> Result<AdminStats, sqlx::Error> {
        sqlx::query_as::<_, AdminStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM families)                                    AS families,
                (SELECT COUNT(*) FROM users)                                       AS users,
                (SELECT COUNT(*) FROM journal_entries)                             AS entries,
                (SELECT COUNT(*) FROM journal_entries
                  WHERE created_at >= NOW() - INTERVAL '7 days')                   AS entries_last_7_days,
                (SELECT COUNT(*) FROM community_posts)                             AS community_posts,
                (SELECT COUNT(*) FROM user_notification_settings
                  WHERE daily_reminder)                                            AS daily_reminders_enabled
            "#,
        )
        .fetch_one(self.pool)
        .await
    }
}
