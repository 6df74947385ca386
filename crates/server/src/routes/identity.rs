use axum::{Extension, Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;

use super::error::ErrorResponse;
use crate::{
    AppState,
    auth::RequestContext,
    db::{
        families::{Family, FamilyRepository},
        users::User,
    },
};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub family: Family,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(name = "identity.get_me", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn get_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<MeResponse>, ErrorResponse> {
    let family = FamilyRepository::new(state.pool())
        .find_by_id(ctx.user.family_id)
        .await
        .map_err(|error| ErrorResponse::internal(error, "failed to load family"))?;

    Ok(Json(MeResponse {
        user: ctx.user,
        family,
    }))
}
