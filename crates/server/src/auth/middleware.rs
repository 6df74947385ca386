use axum::{
    Extension,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::warn;

use crate::{
    AppState,
    db::users::{User, UserError, UserRepository},
};

/// Context for authenticated requests.
#[derive(Clone)]
pub struct RequestContext {
    pub user: User,
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let bearer = match req.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(token)) => token.token().to_owned(),
        None => return StatusCode::UNAUTHORIZED.into_response(),
    };

    let identity = match state.jwt().decode_access_token(&bearer) {
        Ok(identity) => identity,
        Err(error) => {
            warn!(?error, "failed to decode access token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let user = match UserRepository::new(state.pool())
        .fetch_user(identity.user_id)
        .await
    {
        Ok(user) => user,
        Err(UserError::NotFound) => {
            warn!("user `{}` missing", identity.user_id);
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Err(error) => {
            warn!(?error, "failed to load user");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // a token minted before a family move is stale
    if user.family_id != identity.family_id {
        warn!("user `{}` token family mismatch", user.id);
        return StatusCode::UNAUTHORIZED.into_response();
    }

    req.extensions_mut().insert(RequestContext { user });
    next.run(req).await
}

/// Layered inside [`require_session`]; rejects non-admins with 403.
pub async fn require_admin(
    Extension(ctx): Extension<RequestContext>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !ctx.user.is_admin() {
        warn!(user_id = %ctx.user.id, "admin route denied");
        return StatusCode::FORBIDDEN.into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware::from_fn, routing::get};
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::db::users::UserRole;

    fn app_for(role: UserRole) -> Router {
        let user = User {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            display_name: "Someone".to_string(),
            role,
            created_at: Utc::now(),
        };
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(from_fn(require_admin))
            .layer(Extension(RequestContext { user }))
    }

    async fn status_for(role: UserRole) -> StatusCode {
        app_for(role)
            .oneshot(Request::get("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_require_admin_rejects_parent() {
        assert_eq!(status_for(UserRole::Parent).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_require_admin_allows_admin() {
        assert_eq!(status_for(UserRole::Admin).await, StatusCode::OK);
    }
}
