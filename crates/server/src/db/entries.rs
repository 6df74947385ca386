use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, types::Json};
use thiserror::Error;
use uuid::Uuid;

use crate::mood::Mood;

/// Structured mood/energy survey stored alongside an entry. Scores run 1..=5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCheckIn {
    pub energy: u8,
    pub patience: u8,
    pub connection: u8,
    pub self_care: u8,
    pub gratitude: Option<String>,
    pub intentions: Option<String>,
}

impl DailyCheckIn {
    pub fn validate(&self) -> Result<(), EntryError> {
        let scores = [
            ("energy", self.energy),
            ("patience", self.patience),
            ("connection", self.connection),
            ("self_care", self.self_care),
        ];
        for (name, score) in scores {
            if !(1..=5).contains(&score) {
                return Err(EntryError::Invalid(format!(
                    "check-in `{name}` must be between 1 and 5"
                )));
            }
        }
        Ok(())
    }

    pub fn average(&self) -> f64 {
        f64::from(
            u16::from(self.energy)
                + u16::from(self.patience)
                + u16::from(self.connection)
                + u16::from(self.self_care),
        ) / 4.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub family_id: Uuid,
    pub author_id: Uuid,
    pub child_id: Option<Uuid>,
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<Mood>,
    pub is_favorite: bool,
    pub has_ai_feedback: bool,
    pub ai_feedback: Option<String>,
    pub developmental_insight: Option<String>,
    pub check_in: Option<Json<DailyCheckIn>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntryData {
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<Mood>,
    pub child_id: Option<Uuid>,
    pub check_in: Option<DailyCheckIn>,
}

impl CreateEntryData {
    pub fn validate(&self) -> Result<(), EntryError> {
        if self.content.trim().is_empty() {
            return Err(EntryError::Invalid("content must not be empty".to_string()));
        }
        if let Some(check_in) = &self.check_in {
            check_in.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEntryData {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<Mood>,
    pub child_id: Option<Uuid>,
    pub check_in: Option<DailyCheckIn>,
}

impl UpdateEntryData {
    pub fn validate(&self) -> Result<(), EntryError> {
        if let Some(content) = &self.content
            && content.trim().is_empty()
        {
            return Err(EntryError::Invalid("content must not be empty".to_string()));
        }
        if let Some(check_in) = &self.check_in {
            check_in.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("journal entry not found")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const ENTRY_COLUMNS: &str = "id, family_id, author_id, child_id, title, content, mood, \
     is_favorite, has_ai_feedback, ai_feedback, developmental_insight, check_in, created_at";

pub struct EntryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EntryRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest first.
    pub async fn list(
        &self,
        family_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JournalEntry>, EntryError> {
        let entries = sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM journal_entries
            WHERE family_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(family_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Every family entry created in `[since, until)`, newest first.
    pub async fn list_between(
        &self,
        family_id: Uuid,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<JournalEntry>, EntryError> {
        let entries = sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM journal_entries
            WHERE family_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            "#
        ))
        .bind(family_id)
        .bind(since)
        .bind(until)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries written by one user since `since`; used for progress emails.
    pub async fn list_by_author_since(
        &self,
        author_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<JournalEntry>, EntryError> {
        let entries = sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM journal_entries
            WHERE author_id = $1
              AND created_at >= $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(author_id)
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn find(&self, family_id: Uuid, id: Uuid) -> Result<JournalEntry, EntryError> {
        sqlx::query_as::<_, JournalEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = $1 AND family_id = $2"
        ))
        .bind(id)
        .bind(family_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(EntryError::NotFound)
    }

    pub async fn create(
        &self,
        family_id: Uuid,
        author_id: Uuid,
        data: CreateEntryData,
    ) -> Result<JournalEntry, EntryError> {
        data.validate()?;

        let entry = sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            INSERT INTO journal_entries (family_id, author_id, child_id, title, content, mood, check_in)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(family_id)
        .bind(author_id)
        .bind(data.child_id)
        .bind(data.title)
        .bind(data.content.trim())
        .bind(data.mood)
        .bind(data.check_in.map(Json))
        .fetch_one(self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn update(
        &self,
        family_id: Uuid,
        id: Uuid,
        data: UpdateEntryData,
    ) -> Result<JournalEntry, EntryError> {
        data.validate()?;

        sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            UPDATE journal_entries AS e
            SET title    = COALESCE($3, e.title),
                content  = COALESCE($4, e.content),
                mood     = COALESCE($5, e.mood),
                child_id = COALESCE($6, e.child_id),
                check_in = COALESCE($7, e.check_in)
            WHERE e.id = $1
              AND e.family_id = $2
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(family_id)
        .bind(data.title)
        .bind(data.content.map(|c| c.trim().to_string()))
        .bind(data.mood)
        .bind(data.child_id)
        .bind(data.check_in.map(Json))
        .fetch_optional(self.pool)
        .await?
        .ok_or(EntryError::NotFound)
    }

    pub async fn toggle_favorite(&self, family_id: Uuid, id: Uuid) -> Result<JournalEntry, EntryError> {
        sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            UPDATE journal_entries AS e
            SET is_favorite = NOT e.is_favorite
            WHERE e.id = $1
              AND e.family_id = $2
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(family_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(EntryError::NotFound)
    }

    pub async fn set_ai_feedback(
        &self,
        family_id: Uuid,
        id: Uuid,
        feedback: &str,
        developmental_insight: Option<&str>,
    ) -> Result<JournalEntry, EntryError> {
        sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            UPDATE journal_entries AS e
            SET ai_feedback           = $3,
                developmental_insight = $4,
                has_ai_feedback       = TRUE
            WHERE e.id = $1
              AND e.family_id = $2
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(family_id)
        .bind(feedback)
        .bind(developmental_insight)
        .fetch_optional(self.pool)
        .await?
        .ok_or(EntryError::NotFound)
    }

    pub async fn delete(&self, family_id: Uuid, id: Uuid) -> Result<(), EntryError> {
        let result = sqlx::query("DELETE FROM journal_entries WHERE id = $1 AND family_id = $2")
            .bind(id)
            .bind(family_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EntryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_in(energy: u8) -> DailyCheckIn {
        DailyCheckIn {
            energy,
            patience: 3,
            connection: 4,
            self_care: 2,
            gratitude: None,
            intentions: None,
        }
    }

    #[test]
    fn test_check_in_rejects_out_of_range_scores() {
        assert!(check_in(3).validate().is_ok());
        assert!(matches!(check_in(0).validate(), Err(EntryError::Invalid(_))));
        assert!(matches!(check_in(6).validate(), Err(EntryError::Invalid(_))));
    }

    #[test]
    fn test_check_in_average() {
        assert_eq!(check_in(3).average(), 3.0);
    }

    #[test]
    fn test_create_rejects_blank_content() {
        let data = CreateEntryData {
            title: None,
            content: "   ".to_string(),
            mood: None,
            child_id: None,
            check_in: None,
        };
        assert!(matches!(data.validate(), Err(EntryError::Invalid(_))));
    }

    #[test]
    fn test_update_without_content_is_valid() {
        assert!(UpdateEntryData::default().validate().is_ok());
    }
}
