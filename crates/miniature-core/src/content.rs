//! Content store and feed presentation rule
//!
//! The store returns raw orderings. Public feeds additionally pass through
//! [`top_level_feed`], which hides replies and blank posts.

use std::sync::Arc;

use crate::models::{Post, PostDraft, PostId, UserId};
use crate::repository::{ListScope, PostRepository};
use crate::{MiniatureError, Result};

/// Keep only posts that belong in a public feed: non-blank content, no parent.
/// Relative order is preserved.
pub fn top_level_feed(posts: Vec<Post>) -> Vec<Post> {
    posts.into_iter().filter(Post::is_feed_visible).collect()
}

/// Post persistence and ranked listings
#[derive(Clone)]
pub struct ContentStore {
    repo: Arc<dyn PostRepository>,
    feed_limit: i64,
}

impl ContentStore {
    /// `feed_limit` caps the newest and trending listings
    pub fn new(repo: Arc<dyn PostRepository>, feed_limit: i64) -> Self {
        Self { repo, feed_limit }
    }

    /// Build an unsaved post. Blank content is rejected.
    pub fn create(
        &self,
        owner_id: UserId,
        content: &str,
        parent_id: Option<PostId>,
    ) -> Result<PostDraft> {
        if content.trim().is_empty() {
            return Err(MiniatureError::constraint("A post needs some \"content\""));
        }
        Ok(PostDraft::new(owner_id, content, parent_id))
    }

    /// Insert when the draft has no id, otherwise update the matching row.
    /// A dangling parent fails the save; the reference is never dropped.
    pub async fn save(&self, draft: PostDraft) -> Result<Post> {
        let post = match draft.id {
            Some(id) => self.repo.update_post(id, &draft).await?,
            None => self.repo.insert_post(&draft).await?,
        };

        tracing::debug!(
            post_id = %post.id,
            owner_id = %post.owner_id,
            parent_id = ?post.parent_id,
            "Saved post"
        );
        Ok(post)
    }

    pub async fn find_by_id(&self, id: PostId) -> Result<Option<Post>> {
        self.repo.get_post(id).await
    }

    /// All posts of an owner, replies included, newest first
    pub async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Post>> {
        self.repo.list_by_owner(owner_id).await
    }

    /// Direct replies to a post, oldest first
    pub async fn find_replies(&self, parent_id: PostId) -> Result<Vec<Post>> {
        self.repo.list_replies(parent_id).await
    }

    /// Newest posts first, at most `feed_limit`
    pub async fn find_newest(&self) -> Result<Vec<Post>> {
        self.repo.list_newest(ListScope::All, self.feed_limit).await
    }

    /// Most replied-to posts first, ties broken by recency, at most `feed_limit`
    pub async fn find_trending(&self) -> Result<Vec<Post>> {
        self.repo.list_trending(ListScope::All, self.feed_limit).await
    }

    /// Up to `feed_limit` feed-visible posts, newest first.
    /// Replies never take a slot from a top-level post.
    pub async fn newest_feed(&self) -> Result<Vec<Post>> {
        let posts = self
            .repo
            .list_newest(ListScope::TopLevel, self.feed_limit)
            .await?;
        Ok(top_level_feed(posts))
    }

    /// Up to `feed_limit` feed-visible posts, most replied-to first
    pub async fn trending_feed(&self) -> Result<Vec<Post>> {
        let posts = self
            .repo
            .list_trending(ListScope::TopLevel, self.feed_limit)
            .await?;
        Ok(top_level_feed(posts))
    }
}
