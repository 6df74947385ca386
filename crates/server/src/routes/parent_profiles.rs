use axum::{Extension, Json, Router, extract::State, routing::get};
use tracing::instrument;

use super::error::ErrorResponse;
use crate::{
    AppState,
    auth::RequestContext,
    db::parent_profiles::{
        ParentProfile, ParentProfileError, ParentProfileRepository, UpsertParentProfileData,
    },
};

pub fn router() -> Router<AppState> {
    Router::new().route("/parent-profile", get(get_profile).put(upsert_profile))
}

#[instrument(name = "parent_profiles.get", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn get_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ParentProfile>, ErrorResponse> {
    ParentProfileRepository::new(state.pool())
        .find_by_user(ctx.user.id)
        .await
        .map(Json)
        .map_err(|error| match error {
            ParentProfileError::NotFound => ErrorResponse::not_found("parent profile not found"),
            other => ErrorResponse::internal(other, "failed to load parent profile"),
        })
}

#[instrument(name = "parent_profiles.upsert", skip(state, ctx, payload), fields(user_id = %ctx.user.id))]
async fn upsert_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<UpsertParentProfileData>,
) -> Result<Json<ParentProfile>, ErrorResponse> {
    if payload.name.trim().is_empty() {
        return Err(ErrorResponse::bad_request("name is required"));
    }

    let profile = ParentProfileRepository::new(state.pool())
        .upsert(ctx.user.id, ctx.user.family_id, payload)
        .await
        .map_err(|error| ErrorResponse::internal(error, "failed to save parent profile"))?;

    Ok(Json(profile))
}
