//! User handlers
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use miniature_core::{Post, UserId, UserPublic};
use std::sync::Arc;

/// Profile of the authenticated caller
pub async fn current_user_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<UserPublic> {
    Json(UserPublic {
        id: user.user_id,
        username: user.username,
        display_name: user.display_name,
    })
}

/// Every post of the caller, replies included, newest first
pub async fn current_user_posts_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts = state.content.find_by_owner(user.user_id).await?;
    Ok(Json(posts))
}

/// Public profile lookup
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserPublic>, AppError> {
    let not_found = || AppError::NotFound("User".to_string());

    let id: UserId = id.parse().map_err(|_| not_found())?;
    let user = state
        .credentials
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(user.to_public()))
}
