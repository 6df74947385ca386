use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use super::error::ErrorResponse;
use crate::{
    AppState,
    auth::RequestContext,
    db::notification_settings::{
        NotificationSettings, NotificationSettingsError, NotificationSettingsRepository,
        UpdateNotificationSettings,
    },
    mail::templates,
};

#[derive(Debug, Serialize)]
pub struct TestNotificationResponse {
    pub sent_to: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/notification-settings",
            get(get_settings).put(update_settings),
        )
        .route("/notification-settings/test", post(send_test))
}

fn settings_error(error: NotificationSettingsError, context: &str) -> ErrorResponse {
    match error {
        NotificationSettingsError::Invalid(message) => ErrorResponse::bad_request(message),
        other => ErrorResponse::internal(other, context),
    }
}

#[instrument(name = "notification_settings.get", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn get_settings(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<NotificationSettings>, ErrorResponse> {
    NotificationSettingsRepository::new(state.pool())
        .get_or_default(ctx.user.id)
        .await
        .map(Json)
        .map_err(|error| settings_error(error, "failed to load notification settings"))
}

#[instrument(name = "notification_settings.update", skip(state, ctx, payload), fields(user_id = %ctx.user.id))]
async fn update_settings(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<UpdateNotificationSettings>,
) -> Result<Json<NotificationSettings>, ErrorResponse> {
    NotificationSettingsRepository::new(state.pool())
        .upsert(ctx.user.id, payload)
        .await
        .map(Json)
        .map_err(|error| settings_error(error, "failed to save notification settings"))
}

/// Sends immediately, bypassing the scheduler and the delivery ledger.
#[instrument(name = "notification_settings.test", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn send_test(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<TestNotificationResponse>, ErrorResponse> {
    let settings = NotificationSettingsRepository::new(state.pool())
        .get_or_default(ctx.user.id)
        .await
        .map_err(|error| settings_error(error, "failed to load notification settings"))?;

    let destination = settings
        .notification_email
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| ctx.user.email.clone());

    let message = templates::test_message(&destination, &ctx.user.display_name);
    state.mailer().send(&message).await.map_err(|error| {
        tracing::error!(?error, "failed to send test notification");
        ErrorResponse::new(StatusCode::BAD_GATEWAY, "email provider rejected the message")
    })?;

    Ok(Json(TestNotificationResponse {
        sent_to: destination,
    }))
}
