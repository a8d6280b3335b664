/// Authentication middleware for protecting routes
///
/// Extracts the bearer token from the Authorization header, verifies it and
/// resolves the account it was issued to. On success the caller's identity
/// is added to request extensions and the wrapped handler runs once; every
/// rejection returns before the handler is reached.
use super::jwt::TokenError;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use miniature_core::{MiniatureError, User, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Identity of the caller, resolved from the token subject
///
/// Extract in handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            display_name: user.display_name,
        }
    }
}

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token missing")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Account no longer available")]
    UnknownAccount,

    #[error("Account lookup failed: {0}")]
    Upstream(MiniatureError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                ApiError::unauthorized("Token missing"),
            ),
            AuthError::InvalidToken(e) => {
                return AppError::from(MiniatureError::from(e)).into_response();
            }
            AuthError::UnknownAccount => (
                StatusCode::UNAUTHORIZED,
                ApiError::unauthorized("Account no longer available"),
            ),
            AuthError::Upstream(err) => {
                tracing::error!(error = %err, "Could not resolve token subject");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
        };

        error.into_response_with(status)
    }
}

/// The credential of an `Authorization: Bearer <token>` header, if any
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware that requires a valid token for a live account
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use miniature_api::auth::middleware::require_auth_token;
///
/// let protected = Router::new()
///     .route("/users/current", get(current_user))
///     .layer(middleware::from_fn_with_state(state.clone(), require_auth_token));
/// ```
pub async fn require_auth_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path().to_string();

    let Some(token) = bearer_token(request.headers()) else {
        audit_log(&AuditEvent::MissingToken {
            path,
            client: ClientInfo::from_headers(request.headers()),
        });
        return Err(AuthError::MissingToken);
    };

    let claims = match state.tokens.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                path,
                reason: e.to_string(),
                client: ClientInfo::from_headers(request.headers()),
            });
            return Err(AuthError::InvalidToken(e));
        }
    };
    let user_id = claims.user_id()?;

    let user = state
        .credentials
        .find_by_id(user_id)
        .await
        .map_err(AuthError::Upstream)?;

    let Some(user) = user else {
        audit_log(&AuditEvent::UnknownAccount {
            user_id,
            path,
            client: ClientInfo::from_headers(request.headers()),
        });
        return Err(AuthError::UnknownAccount);
    };

    request.extensions_mut().insert(AuthenticatedUser::from(user));

    Ok(next.run(request).await)
}
