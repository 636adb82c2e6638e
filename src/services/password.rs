//! Argon2id hashing for account secrets.
//!
//! Hashing and verification are CPU-bound and always run on the blocking pool.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task;
use tracing::warn;

use crate::config::SecurityConfig;

#[derive(Clone)]
pub struct SecretHasher {
    params: Params,
    dummy_hash: Arc<OnceCell<String>>,
}

impl SecretHasher {
    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self {
            params,
            dummy_hash: Arc::new(OnceCell::new()),
        })
    }

    pub async fn hash(&self, secret: &str) -> Result<String> {
        let secret = secret.to_string();
        let params = self.params.clone();

        task::spawn_blocking(move || hash_with_params(&secret, params))
            .await
            .context("Password hashing task panicked")?
    }

    /// Constant-time comparison of `secret` against a PHC string. A malformed
    /// hash counts as a mismatch.
    pub async fn verify(&self, secret: &str, hash: &str) -> bool {
        let secret = secret.to_string();
        let hash = hash.to_string();

        let outcome = task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;
            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(secret.as_bytes(), &parsed)
                    .is_ok(),
            )
        })
        .await;

        match outcome {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                warn!(error = %e, "Stored secret hash could not be parsed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Password verification task failed");
                false
            }
        }
    }

    /// Burns the same work as a real verification. Used when no account
    /// matched so the response time does not reveal that.
    pub async fn dummy_verify(&self, secret: &str) {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async {
                let throwaway = uuid::Uuid::new_v4().to_string();
                self.hash(&throwaway).await
            })
            .await;

        match hash {
            Ok(hash) => {
                let _ = self.verify(secret, hash).await;
            }
            Err(e) => warn!(error = %e, "Failed to prepare dummy hash"),
        }
    }
}

fn hash_with_params(secret: &str, params: Params) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Random secret for generated accounts (64 hex characters).
#[must_use]
pub fn generate_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> SecretHasher {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 64,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        };
        SecretHasher::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).await);
        assert!(!hasher.verify("wrong horse", &hash).await);
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("anything", "not-a-phc-string").await);
    }

    #[tokio::test]
    async fn dummy_verify_completes() {
        let hasher = fast_hasher();
        hasher.dummy_verify("guess").await;
        hasher.dummy_verify("guess again").await;
        assert!(hasher.dummy_hash.get().is_some());
    }

    #[test]
    fn generated_secret_is_hex() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
