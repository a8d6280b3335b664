//! Password hashing and verification using Argon2id
//!
//! Secrets are never stored or compared in plaintext. The stored value is a
//! PHC string carrying algorithm, parameters and salt, so verification needs
//! nothing but the string itself.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2 cost parameters
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Iterations
    pub time_cost: u32,
    /// Lanes
    pub parallelism: u32,
    /// Output length in bytes
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Cheap parameters for tests and local runs
    pub fn low_cost() -> Self {
        Self {
            memory_cost: 256,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash a plaintext password with the given parameters
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let params = config.to_params()?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError)` - Stored hash is unreadable
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}
