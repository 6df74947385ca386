use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::{children::child_error, error::ErrorResponse};
use crate::{
    AppState,
    analytics::local_date,
    auth::RequestContext,
    db::{
        children::ChildRepository,
        milestones::{
            CreateMilestoneData, Milestone, MilestoneError, MilestoneRepository,
            UpdateMilestoneData,
        },
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/children/{child_id}/milestones",
            get(list_milestones).post(create_milestone),
        )
        .route(
            "/milestones/{milestone_id}",
            patch(update_milestone).delete(delete_milestone),
        )
        .route("/milestones/{milestone_id}/toggle", post(toggle_milestone))
}

fn milestone_error(error: MilestoneError, context: &str) -> ErrorResponse {
    match error {
        MilestoneError::NotFound => ErrorResponse::not_found("milestone not found"),
        MilestoneError::Invalid(message) => ErrorResponse::bad_request(message),
        other => ErrorResponse::internal(other, context),
    }
}

/// 404 unless the child belongs to the caller's family.
async fn ensure_child(state: &AppState, family_id: Uuid, child_id: Uuid) -> Result<(), ErrorResponse> {
    ChildRepository::new(state.pool())
        .find(family_id, child_id)
        .await
        .map(|_| ())
        .map_err(|error| child_error(error, "failed to load child profile"))
}

#[instrument(name = "milestones.list", skip(state, ctx), fields(user_id = %ctx.user.id, child_id = %child_id))]
async fn list_milestones(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Vec<Milestone>>, ErrorResponse> {
    ensure_child(&state, ctx.user.family_id, child_id).await?;

    MilestoneRepository::new(state.pool())
        .list_for_child(ctx.user.family_id, child_id)
        .await
        .map(Json)
        .map_err(|error| milestone_error(error, "failed to list milestones"))
}

#[instrument(name = "milestones.create", skip(state, ctx, payload), fields(user_id = %ctx.user.id, child_id = %child_id))]
async fn create_milestone(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(child_id): Path<Uuid>,
    Json(payload): Json<CreateMilestoneData>,
) -> Result<(StatusCode, Json<Milestone>), ErrorResponse> {
    payload
        .validate()
        .map_err(|error| milestone_error(error, "invalid milestone"))?;
    ensure_child(&state, ctx.user.family_id, child_id).await?;

    let milestone = MilestoneRepository::new(state.pool())
        .create(ctx.user.family_id, child_id, payload)
        .await
        .map_err(|error| milestone_error(error, "failed to create milestone"))?;

    Ok((StatusCode::CREATED, Json(milestone)))
}

#[instrument(name = "milestones.update", skip(state, ctx, payload), fields(user_id = %ctx.user.id, milestone_id = %milestone_id))]
async fn update_milestone(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(milestone_id): Path<Uuid>,
    Json(payload): Json<UpdateMilestoneData>,
) -> Result<Json<Milestone>, ErrorResponse> {
    MilestoneRepository::new(state.pool())
        .update(ctx.user.family_id, milestone_id, payload)
        .await
        .map(Json)
        .map_err(|error| milestone_error(error, "failed to update milestone"))
}

#[instrument(name = "milestones.toggle", skip(state, ctx), fields(user_id = %ctx.user.id, milestone_id = %milestone_id))]
async fn toggle_milestone(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(milestone_id): Path<Uuid>,
) -> Result<Json<Milestone>, ErrorResponse> {
    let today = local_date(Utc::now(), state.utc_offset());

    MilestoneRepository::new(state.pool())
        .toggle(ctx.user.family_id, milestone_id, today)
        .await
        .map(Json)
        .map_err(|error| milestone_error(error, "failed to toggle milestone"))
}

#[instrument(name = "milestones.delete", skip(state, ctx), fields(user_id = %ctx.user.id, milestone_id = %milestone_id))]
async fn delete_milestone(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(milestone_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    MilestoneRepository::new(state.pool())
        .delete(ctx.user.family_id, milestone_id)
        .await
        .map_err(|error| milestone_error(error, "failed to delete milestone"))?;

    Ok(StatusCode::NO_CONTENT)
}
