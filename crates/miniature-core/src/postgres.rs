//! PostgreSQL persistence collaborator
//!
//! Implements the user and post repositories with SQLx. Every call acquires
//! one pooled connection for the duration of a single statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::FromRow;

use crate::config::DatabaseConfig;
use crate::models::{Post, PostDraft, PostId, User, UserDraft, UserId};
use crate::repository::{ListScope, PostRepository, UserRepository};
use crate::{MiniatureError, Result};

const USER_COLUMNS: &str = "id, username, display_name, password_hash";
const POST_COLUMNS: &str = "id, owner_id, content, parent_id, created_at";

fn scope_filter(scope: ListScope) -> &'static str {
    match scope {
        ListScope::All => "",
        ListScope::TopLevel => "WHERE parent_id IS NULL AND content ~ '[^[:space:]]'",
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_options = PgPoolOptions::new().max_connections(config.pool_size);

        let pool = match &config.url {
            Some(url) => pool_options.connect(url).await,
            None => {
                let options = PgConnectOptions::new()
                    .host(&config.host)
                    .port(config.port)
                    .database(&config.name)
                    .username(&config.user)
                    .password(&config.password);
                pool_options.connect_with(options).await
            }
        }
        .map_err(|e| MiniatureError::upstream(format!("PostgreSQL connection failed: {e}")))?;

        tracing::info!(
            host = %config.host,
            database = %config.name,
            pool_size = config.pool_size,
            "Connected to PostgreSQL"
        );

        Ok(Self { pool })
    }

    /// Apply embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MiniatureError::upstream(format!("Migration failed: {e}")))
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    display_name: String,
    password_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            username: row.username,
            display_name: row.display_name,
            password_hash: row.password_hash,
        }
    }
}

/// Post row from database
#[derive(Debug, FromRow)]
struct PostRow {
    id: i64,
    owner_id: i64,
    content: String,
    parent_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: PostId(row.id),
            owner_id: UserId(row.owner_id),
            content: row.content,
            parent_id: row.parent_id.map(PostId),
            created_at: row.created_at,
        }
    }
}

/// Translate a failed write into the error taxonomy.
///
/// Constraint failures reported by PostgreSQL become `ConstraintViolation`
/// with a message the client can act on; anything else is upstream.
fn map_write_error(err: sqlx::Error, action: &str) -> MiniatureError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return MiniatureError::constraint("Username is already taken");
        }
        if db_err.is_foreign_key_violation() {
            return match db_err.constraint() {
                Some(name) if name.contains("parent") => {
                    MiniatureError::constraint("Parent post does not exist")
                }
                Some(name) if name.contains("owner") => {
                    MiniatureError::constraint("Post owner does not exist")
                }
                _ => MiniatureError::constraint("Referenced record does not exist"),
            };
        }
        if db_err.is_check_violation() {
            return MiniatureError::constraint("A required field is empty");
        }
    }
    MiniatureError::upstream(format!("Failed to {action}: {err}"))
}

fn map_read_error(err: sqlx::Error, action: &str) -> MiniatureError {
    MiniatureError::upstream(format!("Failed to {action}: {err}"))
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, draft: &UserDraft) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (username, display_name, password_hash) \
             VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(&draft.username)
        .bind(&draft.display_name)
        .bind(&draft.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "create user"))?;

        Ok(row.into())
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET username = $2, display_name = $3, password_hash = $4 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.0)
        .bind(&draft.username)
        .bind(&draft.display_name)
        .bind(&draft.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "update user"))?;

        row.map(User::from)
            .ok_or_else(|| MiniatureError::NotFound("User".to_string()))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_read_error(e, "get user"))?;

        Ok(row.map(User::from))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(username) = lower($1) LIMIT 1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "get user by username"))?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl PostRepository for PgStore {
    async fn insert_post(&self, draft: &PostDraft) -> Result<Post> {
        let row: PostRow = sqlx::query_as(&format!(
            "INSERT INTO posts (owner_id, content, parent_id) \
             VALUES ($1, $2, $3) RETURNING {POST_COLUMNS}"
        ))
        .bind(draft.owner_id.0)
        .bind(&draft.content)
        .bind(draft.parent_id.map(|p| p.0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "create post"))?;

        Ok(row.into())
    }

    async fn update_post(&self, id: PostId, draft: &PostDraft) -> Result<Post> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "UPDATE posts SET owner_id = $2, content = $3, parent_id = $4 \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id.0)
        .bind(draft.owner_id.0)
        .bind(&draft.content)
        .bind(draft.parent_id.map(|p| p.0))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "update post"))?;

        row.map(Post::from)
            .ok_or_else(|| MiniatureError::NotFound("Post".to_string()))
    }

    async fn get_post(&self, id: PostId) -> Result<Option<Post>> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_read_error(e, "get post"))?;

        Ok(row.map(Post::from))
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE owner_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "list posts by owner"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_replies(&self, parent_id: PostId) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE parent_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(parent_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "list replies"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_newest(&self, scope: ListScope, limit: i64) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts {} \
             ORDER BY created_at DESC, id DESC LIMIT $1",
            scope_filter(scope)
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "list newest posts"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_trending(&self, scope: ListScope, limit: i64) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM post_trending {} \
             ORDER BY reply_count DESC, created_at DESC, id DESC LIMIT $1",
            scope_filter(scope)
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "list trending posts"))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}
