use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, PgPool, Postgres};
use thiserror::Error;
use uuid::Uuid;

/// A household; every private record hangs off one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("family not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct FamilyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FamilyRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Family, FamilyError> {
        sqlx::query_as::<_, Family>("SELECT id, name, created_at FROM families WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(FamilyError::NotFound)
    }

    /// Insert a family using any executor, so registration can run it inside a transaction.
    pub async fn create_with<'e, E>(executor: E, name: &str) -> Result<Family, FamilyError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let family = sqlx::query_as::<_, Family>(
            r#"
            INSERT INTO families (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(executor)
        .await?;

        Ok(family)
    }
}
