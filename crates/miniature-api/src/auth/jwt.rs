//! Token service: JWT generation and validation
//!
//! Tokens are HMAC-SHA256 signed and carry nothing but the user id and the
//! issue/expiry timestamps. Verification is stateless, so any instance that
//! shares the secret accepts tokens issued by any other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use miniature_core::{AuthConfig, MiniatureError, User, UserId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Claims embedded in every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

impl Claims {
    /// The user this token was issued to
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Malformed)
    }
}

/// Token generation and validation errors
///
/// Every validation variant means "invalid token" to a client; the
/// distinction only exists for audit logs.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Malformed token")]
    Malformed,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("System time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),
}

impl From<TokenError> for MiniatureError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed | TokenError::Expired | TokenError::InvalidSignature => {
                MiniatureError::InvalidToken
            }
            TokenError::Encoding(e) => MiniatureError::Other(e.into()),
            TokenError::SystemTime(e) => MiniatureError::Other(e.into()),
        }
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Issues and verifies bearer tokens with a server-held secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime_secs: u64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `verify_at` against an explicit clock, without leeway
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            lifetime_secs: config.token_lifetime_secs,
        }
    }

    /// Sign a token for `user` valid from now for the configured lifetime
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        self.issue_at(user.id, unix_now()?)
    }

    /// Sign a token as if the current time were `now`
    pub fn issue_at(&self, user_id: UserId, now: u64) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(self.lifetime_secs),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            expires_in: self.lifetime_secs,
        })
    }

    /// Check signature and expiry against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, unix_now()?)
    }

    /// Check signature and expiry against `now`.
    ///
    /// A token is expired from the second its `exp` is reached.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            },
        )?;

        let claims = token_data.claims;
        claims.user_id()?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
