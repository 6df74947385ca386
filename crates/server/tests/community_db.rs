//! Community repository tests against a real PostgreSQL database.
//!
//! # Running
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p server --test community_db
//! ```
//!
//! Tests are skipped if DATABASE_URL is not set. Migrations are applied on connect.

use sqlx::PgPool;
use uuid::Uuid;

use server::db::{
    self,
    community::{CommunityError, CommunityRepository, CreateCommentData, CreatePostData, PostCategory},
    families::FamilyRepository,
    users::{CreateUserData, User, UserRepository},
};

fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

macro_rules! skip_without_db {
    () => {
        if database_url().is_none() {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        }
    };
}

async fn create_pool() -> PgPool {
    let url = database_url().expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    pool
}

async fn create_test_user(pool: &PgPool, display_name: &str) -> User {
    let family = FamilyRepository::create_with(pool, "Community family")
        .await
        .expect("Failed to create family");
    UserRepository::create_with(
        pool,
        CreateUserData {
            family_id: family.id,
            email: format!("parent-{}@example.com", Uuid::new_v4()),
            display_name: display_name.to_string(),
            password_hash: "unused".to_string(),
        },
    )
    .await
    .expect("Failed to create user")
}

async fn promote_to_admin(pool: &PgPool, user: &User) -> User {
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(user.id)
        .execute(pool)
        .await
        .expect("Failed to promote user");
    UserRepository::new(pool).fetch_user(user.id).await.unwrap()
}

fn post(title: &str, is_anonymous: bool) -> CreatePostData {
    CreatePostData {
        title: title.to_string(),
        content: "Any tips for early wake-ups?".to_string(),
        category: PostCategory::Sleep,
        is_anonymous,
    }
}

#[tokio::test]
async fn test_anonymous_post_hides_author_identity() {
    skip_without_db!();
    let pool = create_pool().await;
    let author = create_test_user(&pool, "Casey").await;
    let repo = CommunityRepository::new(&pool);

    let anonymous = repo.create_post(author.id, post("5am again", true)).await.unwrap();
    let named = repo.create_post(author.id, post("Nap schedule", false)).await.unwrap();

    assert_eq!(anonymous.author_id, None);
    assert_eq!(anonymous.author_name, None);
    assert_eq!(named.author_id, Some(author.id));
    assert_eq!(named.author_name.as_deref(), Some("Casey"));

    let reloaded = repo.find_post(anonymous.id).await.unwrap();
    assert_eq!(reloaded.author_id, None);
    let json = serde_json::to_value(&reloaded).unwrap();
    assert!(json["author_id"].is_null());

    let comment = repo
        .add_comment(
            named.id,
            author.id,
            CreateCommentData {
                content: "Blackout curtains helped us".to_string(),
                is_anonymous: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(comment.author_id, None);
    assert_eq!(comment.author_name, None);

    let listed = repo.list_comments(named.id).await.unwrap();
    assert!(listed.iter().all(|c| c.author_id.is_none()));
}

#[tokio::test]
async fn test_delete_post_requires_author_or_admin() {
    skip_without_db!();
    let pool = create_pool().await;
    let author = create_test_user(&pool, "Casey").await;
    let stranger = create_test_user(&pool, "Riley").await;
    let admin = promote_to_admin(&pool, &create_test_user(&pool, "Moderator").await).await;
    let repo = CommunityRepository::new(&pool);

    let first = repo.create_post(author.id, post("Teething", true)).await.unwrap();
    let second = repo.create_post(author.id, post("Picky eating", false)).await.unwrap();

    assert!(matches!(
        repo.delete_post(first.id, &stranger).await,
        Err(CommunityError::Forbidden)
    ));
    assert!(repo.find_post(first.id).await.is_ok());

    // anonymity does not stop the author deleting their own post
    repo.delete_post(first.id, &author).await.unwrap();
    assert!(matches!(
        repo.find_post(first.id).await,
        Err(CommunityError::NotFound)
    ));

    repo.delete_post(second.id, &admin).await.unwrap();
    assert!(matches!(
        repo.delete_post(second.id, &admin).await,
        Err(CommunityError::NotFound)
    ));
}
