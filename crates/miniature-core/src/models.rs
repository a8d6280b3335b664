//! Domain models for users and posts
//!
//! Saved entities are immutable value records (`User`, `Post`). Changes go
//! through drafts (`UserDraft`, `PostDraft`): a draft without an id is an
//! insert, a draft obtained from `edit()` carries the id and is an update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// User identifier assigned by the persistence layer
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

/// Post identifier assigned by the persistence layer
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PostId(pub i64);

macro_rules! impl_id {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map($ty)
            }
        }

        impl From<i64> for $ty {
            fn from(value: i64) -> Self {
                $ty(value)
            }
        }
    };
}

impl_id!(UserId);
impl_id!(PostId);

// ============================================================================
// Users
// ============================================================================

/// Saved user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    /// Argon2id PHC string, never serialized in API responses
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

impl User {
    /// Start an update of this user; saving the draft overwrites the row by id
    pub fn edit(&self) -> UserDraft {
        UserDraft {
            id: Some(self.id),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            password_hash: self.password_hash.clone(),
        }
    }

    /// Public representation (safe for API responses)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Unsaved or pending user record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub id: Option<UserId>,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
}

impl UserDraft {
    /// Draft for a new account. The secret must already be hashed.
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            username: username.into(),
            display_name: display_name.into(),
            password_hash: password_hash.into(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Whether saving this draft inserts a new row
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Materialize the saved record once the store has assigned an id
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            username: self.username,
            display_name: self.display_name,
            password_hash: self.password_hash,
        }
    }
}

/// Public user representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
}

// ============================================================================
// Posts
// ============================================================================

/// Saved post. A post with a parent is a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub owner_id: UserId,
    pub content: String,
    pub parent_id: Option<PostId>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Start an update of this post
    pub fn edit(&self) -> PostDraft {
        PostDraft {
            id: Some(self.id),
            owner_id: self.owner_id,
            content: self.content.clone(),
            parent_id: self.parent_id,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Top-level posts with visible content are the only ones shown in feeds
    pub fn is_feed_visible(&self) -> bool {
        !self.is_reply() && !self.content.trim().is_empty()
    }
}

/// Unsaved or pending post record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub id: Option<PostId>,
    pub owner_id: UserId,
    pub content: String,
    pub parent_id: Option<PostId>,
}

impl PostDraft {
    pub fn new(owner_id: UserId, content: impl Into<String>, parent_id: Option<PostId>) -> Self {
        Self {
            id: None,
            owner_id,
            content: content.into(),
            parent_id,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn into_post(self, id: PostId, created_at: DateTime<Utc>) -> Post {
        Post {
            id,
            owner_id: self.owner_id,
            content: self.content,
            parent_id: self.parent_id,
            created_at,
        }
    }
}
