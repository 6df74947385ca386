pub mod admin;
pub mod children;
pub mod community;
pub mod deliveries;
pub mod entries;
pub mod families;
pub mod milestones;
pub mod notification_settings;
pub mod parent_profiles;
pub mod users;

use sqlx::{PgPool, migrate::MigrateError, postgres::PgPoolOptions};

/// Default number of PostgreSQL connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Reads `PJ_PG_MAX_CONNECTIONS`, falling back to 20 when unset, zero or unparsable.
pub fn get_max_connections() -> u32 {
    std::env::var("PJ_PG_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS)
}

pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(get_max_connections())
        .connect(database_url)
        .await
}
