//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::require_auth_token;
use crate::handlers::{auth, health, posts, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// All routes, protected ones wrapped in [`require_auth_token`]
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/login", post(auth::login_handler))
        .route("/register", post(auth::register_handler))
        .route("/users/:id", get(users::get_user_handler))
        .route("/posts/trending", get(posts::trending_handler))
        .route("/posts/newest", get(posts::newest_handler))
        .route("/post/:id", get(posts::get_post_handler))
        .route("/post/:id/replies", get(posts::replies_handler));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/users/current", get(users::current_user_handler))
        .route("/users/current/posts", get(users::current_user_posts_handler))
        .route("/post", post(posts::create_post_handler))
        .layer(middleware::from_fn_with_state(state, require_auth_token));

    Router::new().merge(public_routes).merge(protected_routes)
}
