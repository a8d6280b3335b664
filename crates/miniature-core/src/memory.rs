//! In-memory persistence collaborator
//!
//! Mirrors the constraints of the PostgreSQL schema (case-insensitive unique
//! usernames, existing owner and parent for posts) so stores behave the same
//! on both backends. Used by tests and by `STORE_BACKEND=memory` local runs.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::models::{Post, PostDraft, PostId, User, UserDraft, UserId};
use crate::repository::{ListScope, PostRepository, UserRepository};
use crate::{MiniatureError, Result};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
    next_user_id: i64,
    next_post_id: i64,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        let wanted = username.to_lowercase();
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.username.to_lowercase() == wanted)
    }

    fn check_user(&self, draft: &UserDraft, except: Option<UserId>) -> Result<()> {
        if draft.username.is_empty() {
            return Err(MiniatureError::constraint("A required field is empty"));
        }
        if self.username_taken(&draft.username, except) {
            return Err(MiniatureError::constraint("Username is already taken"));
        }
        Ok(())
    }

    fn check_post(&self, draft: &PostDraft) -> Result<()> {
        if !self.users.contains_key(&draft.owner_id) {
            return Err(MiniatureError::constraint("Post owner does not exist"));
        }
        if let Some(parent_id) = draft.parent_id {
            if !self.posts.contains_key(&parent_id) {
                return Err(MiniatureError::constraint("Parent post does not exist"));
            }
        }
        Ok(())
    }

    fn scoped_posts(&self, scope: ListScope) -> Vec<Post> {
        self.posts
            .values()
            .filter(|p| scope == ListScope::All || p.is_feed_visible())
            .cloned()
            .collect()
    }

    fn reply_counts(&self) -> HashMap<PostId, usize> {
        let mut counts = HashMap::new();
        for parent in self.posts.values().filter_map(|p| p.parent_id) {
            *counts.entry(parent).or_insert(0) += 1;
        }
        counts
    }
}

/// Process-local store behind an async lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn take_limit(posts: impl Iterator<Item = Post>, limit: i64) -> Vec<Post> {
    posts.take(usize::try_from(limit).unwrap_or(0)).collect()
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, draft: &UserDraft) -> Result<User> {
        let mut tables = self.tables.write().await;
        tables.check_user(draft, None)?;

        tables.next_user_id += 1;
        let user = draft.clone().into_user(UserId(tables.next_user_id));
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<User> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(MiniatureError::NotFound("User".to_string()));
        }
        tables.check_user(draft, Some(id))?;

        let user = draft.clone().into_user(id);
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let wanted = username.to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username.to_lowercase() == wanted)
            .cloned())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, draft: &PostDraft) -> Result<Post> {
        let mut tables = self.tables.write().await;
        tables.check_post(draft)?;

        tables.next_post_id += 1;
        let post = draft
            .clone()
            .into_post(PostId(tables.next_post_id), Utc::now());
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: PostId, draft: &PostDraft) -> Result<Post> {
        let mut tables = self.tables.write().await;
        let created_at = match tables.posts.get(&id) {
            Some(existing) => existing.created_at,
            None => return Err(MiniatureError::NotFound("Post".to_string())),
        };
        tables.check_post(draft)?;

        let post = draft.clone().into_post(id, created_at);
        tables.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        posts.sort_by_key(|p| Reverse((p.created_at, p.id)));
        Ok(posts)
    }

    async fn list_replies(&self, parent_id: PostId) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.parent_id == Some(parent_id))
            .cloned()
            .collect();
        posts.sort_by_key(|p| (p.created_at, p.id));
        Ok(posts)
    }

    async fn list_newest(&self, scope: ListScope, limit: i64) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts = tables.scoped_posts(scope);
        posts.sort_by_key(|p| Reverse((p.created_at, p.id)));
        Ok(take_limit(posts.into_iter(), limit))
    }

    async fn list_trending(&self, scope: ListScope, limit: i64) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let counts = tables.reply_counts();
        let mut posts = tables.scoped_posts(scope);
        posts.sort_by_key(|p| {
            Reverse((
                counts.get(&p.id).copied().unwrap_or(0),
                p.created_at,
                p.id,
            ))
        });
        Ok(take_limit(posts.into_iter(), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .insert_user(&UserDraft::new("alice", "Alice", "hash"))
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn test_usernames_are_unique_ignoring_case() {
        let (store, _) = seeded().await;

        let result = store
            .insert_user(&UserDraft::new("ALICE", "Other", "hash"))
            .await;

        assert!(matches!(result, Err(MiniatureError::ConstraintViolation(_))));
        let found = store.get_user_by_username("Alice").await.unwrap().unwrap();
        assert_eq!(found.display_name, "Alice");
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let (store, user) = seeded().await;
        let result = store.update_user(UserId(99), &user.edit()).await;
        assert!(matches!(result, Err(MiniatureError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_post_requires_existing_owner_and_parent() {
        let (store, user) = seeded().await;

        let orphan = store
            .insert_post(&PostDraft::new(UserId(42), "hi", None))
            .await;
        assert!(matches!(orphan, Err(MiniatureError::ConstraintViolation(_))));

        let dangling = store
            .insert_post(&PostDraft::new(user.id, "hi", Some(PostId(7))))
            .await;
        assert!(matches!(dangling, Err(MiniatureError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_trending_orders_by_replies_then_recency() {
        let (store, user) = seeded().await;
        let quiet = store
            .insert_post(&PostDraft::new(user.id, "quiet", None))
            .await
            .unwrap();
        let busy = store
            .insert_post(&PostDraft::new(user.id, "busy", None))
            .await
            .unwrap();
        let newer = store
            .insert_post(&PostDraft::new(user.id, "newer", None))
            .await
            .unwrap();
        store
            .insert_post(&PostDraft::new(user.id, "reply", Some(busy.id)))
            .await
            .unwrap();

        let ids: Vec<PostId> = store
            .list_trending(ListScope::All, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(ids[0], busy.id);
        let newer_pos = ids.iter().position(|id| *id == newer.id).unwrap();
        let quiet_pos = ids.iter().position(|id| *id == quiet.id).unwrap();
        assert!(newer_pos < quiet_pos);
    }

    #[tokio::test]
    async fn test_newest_respects_limit() {
        let (store, user) = seeded().await;
        for i in 0..5 {
            store
                .insert_post(&PostDraft::new(user.id, format!("post {i}"), None))
                .await
                .unwrap();
        }

        let newest = store.list_newest(ListScope::All, 3).await.unwrap();
        assert_eq!(newest.len(), 3);
        assert_eq!(newest[0].content, "post 4");
    }

    #[tokio::test]
    async fn test_top_level_scope_filters_before_limit() {
        let (store, user) = seeded().await;
        let root = store
            .insert_post(&PostDraft::new(user.id, "root", None))
            .await
            .unwrap();
        store
            .insert_post(&PostDraft::new(user.id, "  ", None))
            .await
            .unwrap();
        for i in 0..3 {
            store
                .insert_post(&PostDraft::new(user.id, format!("reply {i}"), Some(root.id)))
                .await
                .unwrap();
        }

        let newest = store.list_newest(ListScope::TopLevel, 2).await.unwrap();
        let trending = store.list_trending(ListScope::TopLevel, 1).await.unwrap();

        assert_eq!(newest, vec![root.clone()]);
        assert_eq!(trending, vec![root]);
    }
}
