use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::users::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "post_category", rename_all = "snake_case")]
pub enum PostCategory {
    #[default]
    General,
    Sleep,
    Feeding,
    Behavior,
    Milestones,
    SelfCare,
}

/// Posts are shared across families. Anonymous posts carry neither `author_id` nor `author_name`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommunityPost {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    pub is_anonymous: bool,
    pub likes: i32,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub content: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostData {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: PostCategory,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentData {
    pub content: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Error)]
pub enum CommunityError {
    #[error("post not found")]
    NotFound,
    #[error("only the author or an admin can delete this post")]
    Forbidden,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const POST_SELECT: &str = r#"
    SELECT p.id,
           CASE WHEN p.is_anonymous THEN NULL ELSE p.author_id END AS author_id,
           CASE WHEN p.is_anonymous THEN NULL ELSE u.display_name END AS author_name,
           p.title,
           p.content,
           p.category,
           p.is_anonymous,
           p.likes,
           (SELECT COUNT(*) FROM community_comments c WHERE c.post_id = p.id) AS comment_count,
           p.created_at
    FROM community_posts p
    INNER JOIN users u ON u.id = p.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id,
           c.post_id,
           CASE WHEN c.is_anonymous THEN NULL ELSE c.author_id END AS author_id,
           CASE WHEN c.is_anonymous THEN NULL ELSE u.display_name END AS author_name,
           c.content,
           c.is_anonymous,
           c.created_at
    FROM community_comments c
    INNER JOIN users u ON u.id = c.author_id
"#;

pub struct CommunityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CommunityRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest first, optionally restricted to one category.
    pub async fn list_posts(
        &self,
        category: Option<PostCategory>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommunityPost>, CommunityError> {
        let posts = sqlx::query_as::<_, CommunityPost>(&format!(
            r#"
            {POST_SELECT}
            WHERE ($1::post_category IS NULL OR p.category = $1)
            ORDER BY p.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    pub async fn find_post(&self, id: Uuid) -> Result<CommunityPost, CommunityError> {
        sqlx::query_as::<_, CommunityPost>(&format!("{POST_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(CommunityError::NotFound)
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        data: CreatePostData,
    ) -> Result<CommunityPost, CommunityError> {
        if data.title.trim().is_empty() || data.content.trim().is_empty() {
            return Err(CommunityError::Invalid(
                "title and content are required".to_string(),
            ));
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO community_posts (author_id, title, content, category, is_anonymous)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(data.title.trim())
        .bind(data.content.trim())
        .bind(data.category)
        .bind(data.is_anonymous)
        .fetch_one(self.pool)
        .await?;

        self.find_post(id).await
    }

    /// Deletes when `requester` wrote the post or is an admin. Anonymity does not affect the check.
    pub async fn delete_post(&self, id: Uuid, requester: &User) -> Result<(), CommunityError> {
        let author_id: Uuid =
            sqlx::query_scalar("SELECT author_id FROM community_posts WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?
                .ok_or(CommunityError::NotFound)?;

        if author_id != requester.id && !requester.is_admin() {
            return Err(CommunityError::Forbidden);
        }

        let result = sqlx::query("DELETE FROM community_posts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CommunityError::NotFound);
        }
        Ok(())
    }

    pub async fn like_post(&self, id: Uuid) -> Result<CommunityPost, CommunityError> {
        let result = sqlx::query("UPDATE community_posts SET likes = likes + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CommunityError::NotFound);
        }
        self.find_post(id).await
    }

    /// Oldest first so threads read top to bottom.
    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, CommunityError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at ASC"
        ))
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;

        Ok(comments)
    }

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        data: CreateCommentData,
    ) -> Result<Comment, CommunityError> {
        if data.content.trim().is_empty() {
            return Err(CommunityError::Invalid("content is required".to_string()));
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO community_comments (post_id, author_id, content, is_anonymous)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(data.content.trim())
        .bind(data.is_anonymous)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return CommunityError::NotFound;
            }
            CommunityError::from(e)
        })?;

        sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(CommunityError::from)
    }
}
