//! Persistence collaborator interfaces
//!
//! Stores never touch a database directly; they are handed one of these
//! traits. `PgStore` and `MemoryStore` implement both.

use async_trait::async_trait;

use crate::models::{Post, PostDraft, PostId, User, UserDraft, UserId};
use crate::Result;

/// Which posts a ranked listing draws from before its limit is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Every post, replies and blank posts included
    All,
    /// Only posts without a parent whose content is not blank
    TopLevel,
}

/// User persistence operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a draft without id and return the saved record.
    /// Fails with `ConstraintViolation` when the username is taken
    /// (compared case-insensitively).
    async fn insert_user(&self, draft: &UserDraft) -> Result<User>;

    /// Overwrite the row matching `id` and return the refreshed record.
    /// Fails with `NotFound` when no row matches.
    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<User>;

    /// Get user by id
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Get user by username, ignoring case
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
}

/// Post persistence operations
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a draft without id. Fails with `ConstraintViolation` when the
    /// parent or the owner does not exist.
    async fn insert_post(&self, draft: &PostDraft) -> Result<Post>;

    /// Overwrite the row matching `id`
    async fn update_post(&self, id: PostId, draft: &PostDraft) -> Result<Post>;

    /// Get post by id
    async fn get_post(&self, id: PostId) -> Result<Option<Post>>;

    /// Posts of one owner, newest first
    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Post>>;

    /// Direct replies to a post, oldest first
    async fn list_replies(&self, parent_id: PostId) -> Result<Vec<Post>>;

    /// Posts by creation time descending, ties by id descending.
    /// `scope` filters before `limit` is applied.
    async fn list_newest(&self, scope: ListScope, limit: i64) -> Result<Vec<Post>>;

    /// Posts by reply count descending, ties broken by recency
    async fn list_trending(&self, scope: ListScope, limit: i64) -> Result<Vec<Post>>;
}
