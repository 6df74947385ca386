use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::ErrorResponse;
use crate::{
    AppState,
    auth::{hash_password, verify_password},
    db::{
        families::FamilyRepository,
        users::{CreateUserData, User, UserError, UserRepository},
    },
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub family_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

fn issue_token(state: &AppState, user: User) -> Result<Json<TokenResponse>, ErrorResponse> {
    let (access_token, expires_at) = state
        .jwt()
        .encode_access_token(&user)
        .map_err(|error| ErrorResponse::internal(error, "failed to issue access token"))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_at,
        user,
    }))
}

#[instrument(name = "auth.register", skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ErrorResponse> {
    let email = payload.email.trim();
    let display_name = payload.display_name.trim();
    if !email.contains('@') {
        return Err(ErrorResponse::bad_request("email is not a valid address"));
    }
    if display_name.is_empty() {
        return Err(ErrorResponse::bad_request("display_name is required"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ErrorResponse::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let family_name = payload
        .family_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{display_name}'s family"));

    let password_hash = hash_password(&payload.password)
        .map_err(|error| ErrorResponse::internal(error, "failed to register"))?;

    let mut tx = state
        .pool()
        .begin()
        .await
        .map_err(|error| ErrorResponse::internal(error, "failed to register"))?;

    let family = FamilyRepository::create_with(&mut *tx, &family_name)
        .await
        .map_err(|error| ErrorResponse::internal(error, "failed to register"))?;

    let user = UserRepository::create_with(
        &mut *tx,
        CreateUserData {
            family_id: family.id,
            email: email.to_string(),
            display_name: display_name.to_string(),
            password_hash,
        },
    )
    .await
    .map_err(|error| match error {
        UserError::EmailTaken => {
            ErrorResponse::new(StatusCode::CONFLICT, "email already registered")
        }
        other => ErrorResponse::internal(other, "failed to register"),
    })?;

    tx.commit()
        .await
        .map_err(|error| ErrorResponse::internal(error, "failed to register"))?;

    tracing::info!(user_id = %user.id, family_id = %family.id, "user registered");
    Ok((StatusCode::CREATED, issue_token(&state, user)?))
}

#[instrument(name = "auth.login", skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ErrorResponse> {
    let invalid = || ErrorResponse::new(StatusCode::UNAUTHORIZED, "invalid email or password");

    let credentials = match UserRepository::new(state.pool())
        .find_credentials(&payload.email)
        .await
    {
        Ok(credentials) => credentials,
        Err(UserError::NotFound) => return Err(invalid()),
        Err(error) => return Err(ErrorResponse::internal(error, "failed to log in")),
    };

    if !verify_password(&payload.password, &credentials.password_hash) {
        tracing::warn!(user_id = %credentials.user.id, "login rejected");
        return Err(invalid());
    }

    issue_token(&state, credentials.user)
}
