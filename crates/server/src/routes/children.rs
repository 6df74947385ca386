use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;
use uuid::Uuid;

use super::error::ErrorResponse;
use crate::{
    AppState,
    auth::RequestContext,
    db::children::{ChildError, ChildProfile, ChildRepository, CreateChildData, UpdateChildData},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/children", get(list_children).post(create_child))
        .route(
            "/children/{child_id}",
            get(get_child).patch(update_child).delete(delete_child),
        )
}

pub(super) fn child_error(error: ChildError, context: &str) -> ErrorResponse {
    match error {
        ChildError::NotFound => ErrorResponse::not_found("child profile not found"),
        ChildError::Invalid(message) => ErrorResponse::bad_request(message),
        other => ErrorResponse::internal(other, context),
    }
}

#[instrument(name = "children.list", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn list_children(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<ChildProfile>>, ErrorResponse> {
    ChildRepository::new(state.pool())
        .list(ctx.user.family_id)
        .await
        .map(Json)
        .map_err(|error| child_error(error, "failed to list children"))
}

#[instrument(name = "children.get", skip(state, ctx), fields(user_id = %ctx.user.id, child_id = %child_id))]
async fn get_child(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(child_id): Path<Uuid>,
) -> Result<Json<ChildProfile>, ErrorResponse> {
    ChildRepository::new(state.pool())
        .find(ctx.user.family_id, child_id)
        .await
        .map(Json)
        .map_err(|error| child_error(error, "failed to load child profile"))
}

#[instrument(name = "children.create", skip(state, ctx, payload), fields(user_id = %ctx.user.id))]
async fn create_child(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateChildData>,
) -> Result<(StatusCode, Json<ChildProfile>), ErrorResponse> {
    let child = ChildRepository::new(state.pool())
        .create(ctx.user.family_id, payload)
        .await
        .map_err(|error| child_error(error, "failed to create child profile"))?;

    Ok((StatusCode::CREATED, Json(child)))
}

#[instrument(name = "children.update", skip(state, ctx, payload), fields(user_id = %ctx.user.id, child_id = %child_id))]
async fn update_child(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(child_id): Path<Uuid>,
    Json(payload): Json<UpdateChildData>,
) -> Result<Json<ChildProfile>, ErrorResponse> {
    ChildRepository::new(state.pool())
        .update(ctx.user.family_id, child_id, payload)
        .await
        .map(Json)
        .map_err(|error| child_error(error, "failed to update child profile"))
}

#[instrument(name = "children.delete", skip(state, ctx), fields(user_id = %ctx.user.id, child_id = %child_id))]
async fn delete_child(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(child_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    ChildRepository::new(state.pool())
        .delete(ctx.user.family_id, child_id)
        .await
        .map_err(|error| child_error(error, "failed to delete child profile"))?;

    Ok(StatusCode::NO_CONTENT)
}
