//! Post and feed handlers
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use miniature_core::{Post, PostId};
use serde::Deserialize;
use std::sync::Arc;

/// New post body. `parent` makes the post a reply.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub parent: Option<PostId>,
}

fn parse_post_id(raw: &str) -> Result<PostId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Post".to_string()))
}

/// Most replied-to top-level posts
pub async fn trending_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.content.trending_feed().await?))
}

/// Latest top-level posts
pub async fn newest_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.content.newest_feed().await?))
}

pub async fn get_post_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let id = parse_post_id(&id)?;
    let post = state
        .content
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;

    Ok(Json(post))
}

/// Direct replies to a post, oldest first
pub async fn replies_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Post>>, AppError> {
    let id = parse_post_id(&id)?;
    if state.content.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Post".to_string()));
    }

    Ok(Json(state.content.find_replies(id).await?))
}

/// Publish a post owned by the caller
///
/// Blank content and unknown parents are answered with `422`.
pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    let draft = state
        .content
        .create(user.user_id, &request.content, request.parent)?;
    let post = state.content.save(draft).await?;

    tracing::info!(post_id = %post.id, owner_id = %user.user_id, "Post created");

    Ok((StatusCode::CREATED, Json(post)))
}
