use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub parenting_style: Option<String>,
    pub concerns: Vec<String>,
    pub goals: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertParentProfileData {
    pub name: String,
    pub parenting_style: Option<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ParentProfileError {
    #[error("parent profile not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct ParentProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ParentProfileRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<ParentProfile, ParentProfileError> {
        sqlx::query_as::<_, ParentProfile>(
            r#"
            SELECT id, user_id, family_id, name, parenting_style, concerns, goals, updated_at
            FROM parent_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(ParentProfileError::NotFound)
    }

    pub async fn upsert(
        &self,
        user_id: Uuid,
        family_id: Uuid,
        data: UpsertParentProfileData,
    ) -> Result<ParentProfile, ParentProfileError> {
        let profile = sqlx::query_as::<_, ParentProfile>(
            r#"
            INSERT INTO parent_profiles (user_id, family_id, name, parenting_style, concerns, goals)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET name            = EXCLUDED.name,
                parenting_style = EXCLUDED.parenting_style,
                concerns        = EXCLUDED.concerns,
                goals           = EXCLUDED.goals,
                updated_at      = NOW()
            RETURNING id, user_id, family_id, name, parenting_style, concerns, goals, updated_at
            "#,
        )
        .bind(user_id)
        .bind(family_id)
        .bind(data.name.trim())
        .bind(data.parenting_style)
        .bind(data.concerns)
        .bind(data.goals)
        .fetch_one(self.pool)
        .await?;

        Ok(profile)
    }
}
