//! Authentication API handlers
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::auth::IssuedToken;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use miniature_core::{MiniatureError, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Registration request body
///
/// Absent fields read as empty so the credential store reports them as
/// constraint violations.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    /// Display name, optional
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

/// Token response shared by login and registration
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: u64,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in,
        }
    }
}

fn issue_for(state: &AppState, user: &User) -> Result<TokenResponse, AppError> {
    state
        .tokens
        .issue(user)
        .map(TokenResponse::from)
        .map_err(|e| MiniatureError::from(e).into())
}

/// Exchange a username and password for an access token
///
/// Responds `401 Unauthorized` for an unknown username or a wrong password
/// alike.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let client = ClientInfo::from_headers(&headers);

    let user = state
        .credentials
        .find_by_credentials(&request.username, &request.password)
        .await?;

    let Some(user) = user else {
        audit_log(&AuditEvent::LoginFailure {
            username: request.username,
            reason: "Invalid username or password".to_string(),
            client,
        });
        return Err(MiniatureError::InvalidCredentials.into());
    };

    let response = issue_for(&state, &user)?;

    audit_log(&AuditEvent::LoginSuccess {
        user_id: user.id,
        username: user.username,
        client,
    });

    Ok(Json(response))
}

/// Create an account and sign the caller in
///
/// Responds `201 Created` with a token, or `422` when the username is taken
/// or a required field is empty.
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let client = ClientInfo::from_headers(&headers);

    let saved = match state
        .credentials
        .create(&request.username, &request.name, &request.password)
        .await
    {
        Ok(draft) => state.credentials.save(draft).await,
        Err(e) => Err(e),
    };

    let user = match saved {
        Ok(user) => user,
        Err(e) => {
            if let MiniatureError::ConstraintViolation(reason) = &e {
                audit_log(&AuditEvent::RegistrationFailure {
                    username: request.username,
                    reason: reason.clone(),
                    client,
                });
            }
            return Err(e.into());
        }
    };

    let response = issue_for(&state, &user)?;

    audit_log(&AuditEvent::RegistrationSuccess {
        user_id: user.id,
        username: user.username,
        client,
    });

    Ok((StatusCode::CREATED, Json(response)))
}
