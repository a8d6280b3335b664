//! Credential store
//!
//! Owns the canonical user records. Every call goes to the persistence
//! collaborator; nothing is cached in process.

use std::sync::Arc;

use crate::models::{User, UserDraft, UserId};
use crate::password::{hash_password, verify_password, PasswordConfig};
use crate::repository::UserRepository;
use crate::{MiniatureError, Result};

/// User lookup, registration and credential checks
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn UserRepository>,
    password: PasswordConfig,
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self {
            repo,
            password: PasswordConfig::default(),
        }
    }

    /// Override the Argon2 cost parameters used for new secrets
    pub fn with_password_config(mut self, password: PasswordConfig) -> Self {
        self.password = password;
        self
    }

    /// Build an unsaved account. The secret is hashed here and never kept.
    pub async fn create(
        &self,
        username: &str,
        display_name: &str,
        secret: &str,
    ) -> Result<UserDraft> {
        if username.trim().is_empty() {
            return Err(MiniatureError::constraint("A \"username\" is required"));
        }
        if secret.is_empty() {
            return Err(MiniatureError::constraint("A \"password\" is required"));
        }

        let password_hash = self.hash(secret).await?;
        Ok(UserDraft::new(username.trim(), display_name.trim(), password_hash))
    }

    /// Insert when the draft has no id, otherwise update the matching row
    pub async fn save(&self, draft: UserDraft) -> Result<User> {
        if draft.username.trim().is_empty() {
            return Err(MiniatureError::constraint("A \"username\" is required"));
        }

        let user = match draft.id {
            Some(id) => self.repo.update_user(id, &draft).await?,
            None => self.repo.insert_user(&draft).await?,
        };

        tracing::debug!(user_id = %user.id, created = draft.is_new(), "Saved user");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.repo.get_user(id).await
    }

    /// Case-insensitive on username, exact on secret.
    ///
    /// A mismatch is `Ok(None)`, never an error.
    pub async fn find_by_credentials(&self, username: &str, secret: &str) -> Result<Option<User>> {
        let Some(user) = self.repo.get_user_by_username(username.trim()).await? else {
            return Ok(None);
        };

        let secret = secret.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&secret, &hash))
            .await
            .map_err(|e| MiniatureError::Other(e.into()))?
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
                MiniatureError::upstream(e)
            })?;

        Ok(matches.then_some(user))
    }

    async fn hash(&self, secret: &str) -> Result<String> {
        let secret = secret.to_string();
        let config = self.password.clone();
        tokio::task::spawn_blocking(move || hash_password(&secret, &config))
            .await
            .map_err(|e| MiniatureError::Other(e.into()))?
            .map_err(|e| MiniatureError::Other(e.into()))
    }
}
