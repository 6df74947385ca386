use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::{PageQuery, error::ErrorResponse};
use crate::{
    AppState,
    auth::RequestContext,
    db::community::{
        Comment, CommunityError, CommunityPost, CommunityRepository, CreateCommentData,
        CreatePostData, PostCategory,
    },
};

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub category: Option<PostCategory>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/community/posts", get(list_posts).post(create_post))
        .route(
            "/community/posts/{post_id}",
            get(get_post).delete(delete_post),
        )
        .route("/community/posts/{post_id}/like", post(like_post))
        .route(
            "/community/posts/{post_id}/comments",
            get(list_comments).post(add_comment),
        )
}

fn community_error(error: CommunityError, context: &str) -> ErrorResponse {
    match error {
        CommunityError::NotFound => ErrorResponse::not_found("post not found"),
        error @ CommunityError::Forbidden => {
            ErrorResponse::new(StatusCode::FORBIDDEN, error.to_string())
        }
        CommunityError::Invalid(message) => ErrorResponse::bad_request(message),
        other => ErrorResponse::internal(other, context),
    }
}

#[instrument(name = "community.list_posts", skip(state, ctx, query), fields(user_id = %ctx.user.id))]
async fn list_posts(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Vec<CommunityPost>>, ErrorResponse> {
    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    CommunityRepository::new(state.pool())
        .list_posts(query.category, page.limit(), page.offset())
        .await
        .map(Json)
        .map_err(|error| community_error(error, "failed to list posts"))
}

#[instrument(name = "community.get_post", skip(state, ctx), fields(user_id = %ctx.user.id, post_id = %post_id))]
async fn get_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<CommunityPost>, ErrorResponse> {
    CommunityRepository::new(state.pool())
        .find_post(post_id)
        .await
        .map(Json)
        .map_err(|error| community_error(error, "failed to load post"))
}

#[instrument(name = "community.create_post", skip(state, ctx, payload), fields(user_id = %ctx.user.id))]
async fn create_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreatePostData>,
) -> Result<(StatusCode, Json<CommunityPost>), ErrorResponse> {
    let post = CommunityRepository::new(state.pool())
        .create_post(ctx.user.id, payload)
        .await
        .map_err(|error| community_error(error, "failed to create post"))?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[instrument(name = "community.delete_post", skip(state, ctx), fields(user_id = %ctx.user.id, post_id = %post_id))]
async fn delete_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(post_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    CommunityRepository::new(state.pool())
        .delete_post(post_id, &ctx.user)
        .await
        .map_err(|error| community_error(error, "failed to delete post"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "community.like_post", skip(state, ctx), fields(user_id = %ctx.user.id, post_id = %post_id))]
async fn like_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<CommunityPost>, ErrorResponse> {
    CommunityRepository::new(state.pool())
        .like_post(post_id)
        .await
        .map(Json)
        .map_err(|error| community_error(error, "failed to like post"))
}

#[instrument(name = "community.list_comments", skip(state, ctx), fields(user_id = %ctx.user.id, post_id = %post_id))]
async fn list_comments(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ErrorResponse> {
    let repo = CommunityRepository::new(state.pool());
    // distinguishes a missing post from one without comments
    repo.find_post(post_id)
        .await
        .map_err(|error| community_error(error, "failed to load post"))?;

    repo.list_comments(post_id)
        .await
        .map(Json)
        .map_err(|error| community_error(error, "failed to list comments"))
}

#[instrument(name = "community.add_comment", skip(state, ctx, payload), fields(user_id = %ctx.user.id, post_id = %post_id))]
async fn add_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentData>,
) -> Result<(StatusCode, Json<Comment>), ErrorResponse> {
    let comment = CommunityRepository::new(state.pool())
        .add_comment(post_id, ctx.user.id, payload)
        .await
        .map_err(|error| community_error(error, "failed to add comment"))?;

    Ok((StatusCode::CREATED, Json(comment)))
}
