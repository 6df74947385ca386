use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, PgPool, Postgres};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Parent,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub family_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A user row together with its password hash; never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserData {
    pub family_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch_user(&self, id: Uuid) -> Result<User, UserError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, family_id, email, display_name, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(UserError::NotFound)
    }

    /// Lookup for login; emails are stored lowercased.
    pub async fn find_credentials(&self, email: &str) -> Result<UserCredentials, UserError> {
        sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, family_id, email, display_name, role, created_at, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(self.pool)
        .await?
        .ok_or(UserError::NotFound)
    }

    pub async fn create_with<'e, E>(executor: E, data: CreateUserData) -> Result<User, UserError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (family_id, email, display_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, family_id, email, display_name, role, created_at
            "#,
        )
        .bind(data.family_id)
        .bind(normalize_email(&data.email))
        .bind(&data.display_name)
        .bind(&data.password_hash)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("users_email_key")
            {
                return UserError::EmailTaken;
            }
            UserError::from(e)
        })
    }

    /// Newest first.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, UserError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, family_id, email, display_name, role, created_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Sam@Example.COM "), "sam@example.com");
    }
}
