use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChildProfile {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub personality_traits: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChildProfile {
    /// Whole months since birth as of `today`, `None` without a birth date or before it.
    pub fn age_in_months(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        if today < dob {
            return None;
        }
        let mut months = (today.year() - dob.year()) * 12 + today.month() as i32 - dob.month() as i32;
        if today.day() < dob.day() {
            months -= 1;
        }
        u32::try_from(months).ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChildData {
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    #[serde(default)]
    pub personality_traits: Vec<String>,
    pub notes: Option<String>,
}

impl CreateChildData {
    pub fn validate(&self) -> Result<(), ChildError> {
        if self.name.trim().is_empty() {
            return Err(ChildError::Invalid("name is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChildData {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub personality_traits: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl UpdateChildData {
    pub fn validate(&self) -> Result<(), ChildError> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err(ChildError::Invalid("name must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ChildError {
    #[error("child profile not found")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const CHILD_COLUMNS: &str =
    "id, family_id, name, date_of_birth, gender, personality_traits, notes, created_at";

pub struct ChildRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChildRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, family_id: Uuid) -> Result<Vec<ChildProfile>, ChildError> {
        let children = sqlx::query_as::<_, ChildProfile>(&format!(
            "SELECT {CHILD_COLUMNS} FROM child_profiles WHERE family_id = $1 ORDER BY created_at ASC"
        ))
        .bind(family_id)
        .fetch_all(self.pool)
        .await?;

        Ok(children)
    }

    /// Scoped to the family; another family's child reads as not found.
    pub async fn find(&self, family_id: Uuid, id: Uuid) -> Result<ChildProfile, ChildError> {
        sqlx::query_as::<_, ChildProfile>(&format!(
            "SELECT {CHILD_COLUMNS} FROM child_profiles WHERE id = $1 AND family_id = $2"
        ))
        .bind(id)
        .bind(family_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(ChildError::NotFound)
    }

    pub async fn create(
        &self,
        family_id: Uuid,
        data: CreateChildData,
    ) -> Result<ChildProfile, ChildError> {
        data.validate()?;

        let child = sqlx::query_as::<_, ChildProfile>(&format!(
            r#"
            INSERT INTO child_profiles (family_id, name, date_of_birth, gender, personality_traits, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CHILD_COLUMNS}
            "#
        ))
        .bind(family_id)
        .bind(data.name.trim())
        .bind(data.date_of_birth)
        .bind(data.gender)
        .bind(data.personality_traits)
        .bind(data.notes)
        .fetch_one(self.pool)
        .await?;

        Ok(child)
    }

    pub async fn update(
        &self,
        family_id: Uuid,
        id: Uuid,
        data: UpdateChildData,
    ) -> Result<ChildProfile, ChildError> {
        data.validate()?;

        sqlx::query_as::<_, ChildProfile>(&format!(
            r#"
            UPDATE child_profiles AS c
            SET name               = COALESCE($3, c.name),
                date_of_birth      = COALESCE($4, c.date_of_birth),
                gender             = COALESCE($5, c.gender),
                personality_traits = COALESCE($6, c.personality_traits),
                notes              = COALESCE($7, c.notes)
            WHERE c.id = $1
              AND c.family_id = $2
            RETURNING {CHILD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(family_id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(data.date_of_birth)
        .bind(data.gender)
        .bind(data.personality_traits)
        .bind(data.notes)
        .fetch_optional(self.pool)
        .await?
        .ok_or(ChildError::NotFound)
    }

    pub async fn delete(&self, family_id: Uuid, id: Uuid) -> Result<(), ChildError> {
        let result = sqlx::query("DELETE FROM child_profiles WHERE id = $1 AND family_id = $2")
            .bind(id)
            .bind(family_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ChildError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_born(dob: Option<NaiveDate>) -> ChildProfile {
        ChildProfile {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            name: "Robin".to_string(),
            date_of_birth: dob,
            gender: None,
            personality_traits: vec![],
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_age_in_months_counts_completed_months() {
        let child = child_born(NaiveDate::from_ymd_opt(2024, 3, 15));
        let day_before = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let birthday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(child.age_in_months(day_before), Some(11));
        assert_eq!(child.age_in_months(birthday), Some(12));
    }

    #[test]
    fn test_age_in_months_without_birth_date() {
        let child = child_born(None);
        assert_eq!(child.age_in_months(Utc::now().date_naive()), None);
    }

    #[test]
    fn test_blank_name_rejected() {
        let create = CreateChildData {
            name: "   ".to_string(),
            date_of_birth: None,
            gender: None,
            personality_traits: vec![],
            notes: None,
        };
        assert!(matches!(create.validate(), Err(ChildError::Invalid(_))));

        let rename = UpdateChildData {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(rename.validate(), Err(ChildError::Invalid(_))));
        assert!(UpdateChildData::default().validate().is_ok());
    }

    #[test]
    fn test_age_in_months_before_birth() {
        let child = child_born(NaiveDate::from_ymd_opt(2030, 1, 1));
        let today = NaiveDate::from_ymd_opt(2029, 12, 1).unwrap();
        assert_eq!(child.age_in_months(today), None);
    }
}
