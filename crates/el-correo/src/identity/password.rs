//! Argon2id password hashing, peppered with the server secret.
//!
//! Stored format: `$argon2id$v=19$m=<kib>,t=<iterations>,p=<lanes>$<salt_b64>$<hash_b64>`.

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::prelude::*;
use rand::{rng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("hashing failed: {0}")]
    HashingFailed(String),
    #[error("password does not match")]
    Mismatch,
    #[error("invalid hash format")]
    InvalidFormat,
    #[error("base64 decoding failed: {0}")]
    Decoding(#[from] base64::DecodeError),
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub hash_length: usize,
    pub salt_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 15_360,
            time_cost: 3,
            parallelism: 2,
            hash_length: 32,
            salt_length: 16,
        }
    }
}

impl PasswordConfig {
    /// Minimum Argon2 cost; used by seeding and tests where hashing speed matters more.
    pub fn low_cost() -> Self {
        Self {
            memory_cost: Params::MIN_M_COST,
            time_cost: 1,
            parallelism: 1,
            ..Self::default()
        }
    }
}

/// Hashes and verifies passwords with a fixed pepper.
pub struct PasswordHasher {
    pepper: SecretString,
    config: PasswordConfig,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    pub fn new(pepper: SecretString, config: PasswordConfig) -> Self {
        Self { pepper, config }
    }

    fn argon2(
        &self,
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
        output_len: usize,
    ) -> Result<Argon2<'_>, PasswordError> {
        let params = Params::new(memory_cost, time_cost, parallelism, Some(output_len))
            .map_err(|err| PasswordError::HashingFailed(err.to_string()))?;
        Argon2::new_with_secret(
            self.pepper.expose_secret().as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            params,
        )
        .map_err(|err| PasswordError::HashingFailed(err.to_string()))
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let config = self.config;
        let mut salt = vec![0u8; config.salt_length];
        rng().fill_bytes(&mut salt);

        let mut output = vec![0u8; config.hash_length];
        self.argon2(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            config.hash_length,
        )?
        .hash_password_into(password.as_bytes(), &salt, &mut output)
        .map_err(|err| PasswordError::HashingFailed(err.to_string()))?;

        Ok(format!(
            "$argon2id$v=19$m={},t={},p={}${}${}",
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            BASE64_STANDARD.encode(&salt),
            BASE64_STANDARD.encode(&output)
        ))
    }

    /// Recompute the hash with the parameters recorded in `stored`.
    pub fn verify(&self, password: &str, stored: &str) -> Result<(), PasswordError> {
        let parts: Vec<&str> = stored.split('$').collect();
        let [_, "argon2id", "v=19", params, salt, hash] = parts.as_slice() else {
            return Err(PasswordError::InvalidFormat);
        };

        let mut memory_cost = None;
        let mut time_cost = None;
        let mut parallelism = None;
        for param in params.split(',') {
            let (key, value) = param.split_once('=').ok_or(PasswordError::InvalidFormat)?;
            let value: u32 = value.parse().map_err(|_| PasswordError::InvalidFormat)?;
            match key {
                "m" => memory_cost = Some(value),
                "t" => time_cost = Some(value),
                "p" => parallelism = Some(value),
                _ => return Err(PasswordError::InvalidFormat),
            }
        }
        let (Some(memory_cost), Some(time_cost), Some(parallelism)) =
            (memory_cost, time_cost, parallelism)
        else {
            return Err(PasswordError::InvalidFormat);
        };

        let salt = BASE64_STANDARD.decode(salt)?;
        let expected = BASE64_STANDARD.decode(hash)?;
        let mut computed = vec![0u8; expected.len()];
        self.argon2(memory_cost, time_cost, parallelism, expected.len())?
            .hash_password_into(password.as_bytes(), &salt, &mut computed)
            .map_err(|err| PasswordError::HashingFailed(err.to_string()))?;

        if computed.as_slice().ct_eq(&expected).into() {
            Ok(())
        } else {
            Err(PasswordError::Mismatch)
        }
    }
}

/// [`PasswordHasher::hash`] on the blocking pool, off the async workers.
pub async fn hash_blocking(
    hasher: Arc<PasswordHasher>,
    password: String,
) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|err| PasswordError::HashingFailed(err.to_string()))?
}

/// [`PasswordHasher::verify`] on the blocking pool, off the async workers.
pub async fn verify_blocking(
    hasher: Arc<PasswordHasher>,
    password: String,
    stored: String,
) -> Result<(), PasswordError> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
        .await
        .map_err(|err| PasswordError::HashingFailed(err.to_string()))?
}
