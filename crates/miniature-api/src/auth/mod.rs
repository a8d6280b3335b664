//! Authentication and authorization module
//!
//! - Stateless HS256 access tokens
//! - Middleware that resolves the bearer of a token to a live account

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, IssuedToken, TokenError, TokenService};
pub use middleware::{bearer_token, require_auth_token, AuthError, AuthenticatedUser};
