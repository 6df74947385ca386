use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "milestone_category", rename_all = "snake_case")]
pub enum MilestoneCategory {
    Physical,
    Cognitive,
    Social,
    Emotional,
    Language,
    #[default]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Milestone {
    pub id: Uuid,
    pub child_id: Uuid,
    pub family_id: Uuid,
    pub title: String,
    pub category: MilestoneCategory,
    pub description: Option<String>,
    pub is_achieved: bool,
    pub achieved_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMilestoneData {
    pub title: String,
    #[serde(default)]
    pub category: MilestoneCategory,
    pub description: Option<String>,
    pub achieved_at: Option<NaiveDate>,
}

impl CreateMilestoneData {
    pub fn validate(&self) -> Result<(), MilestoneError> {
        if self.title.trim().is_empty() {
            return Err(MilestoneError::Invalid("title is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMilestoneData {
    pub title: Option<String>,
    pub category: Option<MilestoneCategory>,
    pub description: Option<String>,
    pub achieved_at: Option<NaiveDate>,
}

impl UpdateMilestoneData {
    pub fn validate(&self) -> Result<(), MilestoneError> {
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            return Err(MilestoneError::Invalid("title must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum MilestoneError {
    #[error("milestone not found")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const MILESTONE_COLUMNS: &str =
    "id, child_id, family_id, title, category, description, is_achieved, achieved_at, created_at";

pub struct MilestoneRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MilestoneRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_child(
        &self,
        family_id: Uuid,
        child_id: Uuid,
    ) -> Result<Vec<Milestone>, MilestoneError> {
        let milestones = sqlx::query_as::<_, Milestone>(&format!(
            r#"
            SELECT {MILESTONE_COLUMNS}
            FROM milestones
            WHERE family_id = $1 AND child_id = $2
            ORDER BY is_achieved ASC, achieved_at DESC NULLS LAST, created_at ASC
            "#
        ))
        .bind(family_id)
        .bind(child_id)
        .fetch_all(self.pool)
        .await?;

        Ok(milestones)
    }

    pub async fn list_for_family(&self, family_id: Uuid) -> Result<Vec<Milestone>, MilestoneError> {
        let milestones = sqlx::query_as::<_, Milestone>(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE family_id = $1 ORDER BY created_at ASC"
        ))
        .bind(family_id)
        .fetch_all(self.pool)
        .await?;

        Ok(milestones)
    }

    /// The caller has already checked that `child_id` belongs to `family_id`.
    pub async fn create(
        &self,
        family_id: Uuid,
        child_id: Uuid,
        data: CreateMilestoneData,
    ) -> Result<Milestone, MilestoneError> {
        data.validate()?;

        let milestone = sqlx::query_as::<_, Milestone>(&format!(
            r#"
            INSERT INTO milestones (child_id, family_id, title, category, description, is_achieved, achieved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MILESTONE_COLUMNS}
            "#
        ))
        .bind(child_id)
        .bind(family_id)
        .bind(data.title.trim())
        .bind(data.category)
        .bind(data.description)
        .bind(data.achieved_at.is_some())
        .bind(data.achieved_at)
        .fetch_one(self.pool)
        .await?;

        Ok(milestone)
    }

    pub async fn update(
        &self,
        family_id: Uuid,
        id: Uuid,
        data: UpdateMilestoneData,
    ) -> Result<Milestone, MilestoneError> {
        data.validate()?;

        sqlx::query_as::<_, Milestone>(&format!(
            r#"
            UPDATE milestones AS m
            SET title       = COALESCE($3, m.title),
                category    = COALESCE($4, m.category),
                description = COALESCE($5, m.description),
                achieved_at = COALESCE($6, m.achieved_at),
                is_achieved = m.is_achieved OR $6 IS NOT NULL
            WHERE m.id = $1
              AND m.family_id = $2
            RETURNING {MILESTONE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(family_id)
        .bind(data.title.as_deref().map(str::trim))
        .bind(data.category)
        .bind(data.description)
        .bind(data.achieved_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(MilestoneError::NotFound)
    }

    /// Flip `is_achieved`; becoming achieved stamps `today`, becoming pending clears the date.
    pub async fn toggle(
        &self,
        family_id: Uuid,
        id: Uuid,
        today: NaiveDate,
    ) -> Result<Milestone, MilestoneError> {
        sqlx::query_as::<_, Milestone>(&format!(
            r#"
            UPDATE milestones AS m
            SET is_achieved = NOT m.is_achieved,
                achieved_at = CASE WHEN m.is_achieved THEN NULL ELSE $3 END
            WHERE m.id = $1
              AND m.family_id = $2
            RETURNING {MILESTONE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(family_id)
        .bind(today)
        .fetch_optional(self.pool)
        .await?
        .ok_or(MilestoneError::NotFound)
    }

    pub async fn delete(&self, family_id: Uuid, id: Uuid) -> Result<(), MilestoneError> {
        let result = sqlx::query("DELETE FROM milestones WHERE id = $1 AND family_id = $2")
            .bind(id)
            .bind(family_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MilestoneError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_rejected() {
        let create = CreateMilestoneData {
            title: " \t".to_string(),
            category: MilestoneCategory::Language,
            description: None,
            achieved_at: None,
        };
        assert!(matches!(create.validate(), Err(MilestoneError::Invalid(_))));

        let retitle = UpdateMilestoneData {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(retitle.validate(), Err(MilestoneError::Invalid(_))));
    }

    #[test]
    fn test_category_defaults_to_other() {
        let data: CreateMilestoneData = serde_json::from_str(r#"{"title":"First word"}"#).unwrap();
        assert_eq!(data.category, MilestoneCategory::Other);
        assert!(data.validate().is_ok());
    }
}
