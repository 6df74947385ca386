use axum::{
    Json, Router,
    http::{Request, header::HeaderName},
    middleware,
    routing::get,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, field};
use utils::build_info::{BUILD_INFO, BuildInfo};

use crate::{
    AppState,
    auth::{require_admin, require_session},
};

mod admin;
mod analytics;
mod auth;
mod children;
mod community;
mod entries;
pub mod error;
mod export;
mod identity;
mod milestones;
mod notification_settings;
mod parent_profiles;
mod wellness;

pub use error::ErrorResponse;

/// Default and ceiling for `limit` on paginated listings.
pub(crate) const DEFAULT_PAGE_SIZE: i64 = 50;
pub(crate) const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

pub fn router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .extensions()
                .get::<RequestId>()
                .and_then(|id| id.header_value().to_str().ok());
            let span = tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = field::Empty
            );
            if let Some(request_id) = request_id {
                span.record("request_id", field::display(request_id));
            }
            span
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO))
        .on_failure(DefaultOnFailure::new().level(Level::ERROR));

    let v1_public = Router::<AppState>::new()
        .route("/health", get(health))
        .merge(auth::public_router());

    let v1_admin = admin::router().layer(middleware::from_fn(require_admin));

    let v1_protected = Router::<AppState>::new()
        .merge(identity::router())
        .merge(parent_profiles::router())
        .merge(children::router())
        .merge(milestones::router())
        .merge(entries::router())
        .merge(analytics::router())
        .merge(community::router())
        .merge(notification_settings::router())
        .merge(wellness::router())
        .merge(export::router())
        .merge(v1_admin)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::<AppState>::new()
        .nest("/v1", v1_public)
        .nest("/v1", v1_protected)
        .layer(CorsLayer::permissive())
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            MakeRequestUuid {},
        ))
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub build: BuildInfo,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        build: BUILD_INFO,
    })
}
