use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    routing::get,
};
use tracing::instrument;

use super::{PageQuery, error::ErrorResponse};
use crate::{
    AppState,
    auth::RequestContext,
    db::{
        admin::{AdminRepository, AdminStats},
        users::{User, UserRepository},
    },
};

/// Mounted behind `require_admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(get_stats))
        .route("/admin/users", get(list_users))
}

#[instrument(name = "admin.stats", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn get_stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<AdminStats>, ErrorResponse> {
    AdminRepository::new(state.pool())
        .stats()
        .await
        .map(Json)
        .map_err(|error| ErrorResponse::internal(error, "failed to load stats"))
}

#[instrument(name = "admin.list_users", skip(state, ctx, page), fields(user_id = %ctx.user.id))]
async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<User>>, ErrorResponse> {
    UserRepository::new(state.pool())
        .list(page.limit(), page.offset())
        .await
        .map(Json)
        .map_err(|error| ErrorResponse::internal(error, "failed to list users"))
}
