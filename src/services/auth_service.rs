//! Domain service for authentication and session resolution.
//!
//! Combines the credential verifier with the lockout governor and applies the
//! enablement and deletion policy the verifier leaves to its caller.

use std::time::Duration;
use thiserror::Error;

use crate::domain::{AccountId, ActorContext, ErrorKind};
use crate::models::account::Account;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Same wording whether the identifier exists or the secret was wrong.
    #[error("Invalid login identifier or password")]
    InvalidCredentials,

    #[error("Too many failed login attempts. Try again later.")]
    Locked { retry_after: Duration },

    #[error("This account is disabled")]
    AccountDisabled,

    #[error("This account has been deleted")]
    AccountDeleted,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Administrator privileges required")]
    Forbidden,

    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::Locked { .. } => ErrorKind::Locked,
            Self::AccountDisabled => ErrorKind::AccountDisabled,
            Self::AccountDeleted => ErrorKind::AccountDeleted,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => *field,
            _ => None,
        }
    }

    /// Seconds a locked-out client should wait, rounded up.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Locked { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Checks the lockout, verifies the credentials and applies account state.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Locked`] while the identifier is locked, and on the
    ///   failure that reaches the attempt limit.
    /// - [`AuthError::InvalidCredentials`] when nothing matched.
    /// - [`AuthError::AccountDisabled`] / [`AuthError::AccountDeleted`] when
    ///   the credentials matched an account that may not sign in.
    async fn login(
        &self,
        actor: &ActorContext,
        identifier: &str,
        secret: &str,
    ) -> Result<Account, AuthError>;

    /// Resolves a session's account id. Soft-deleted and disabled accounts
    /// resolve to `None`, which callers treat as "signed out".
    async fn session_account(&self, id: AccountId) -> Result<Option<Account>, AuthError>;

    async fn logout(&self, actor: &ActorContext, account: &Account);
}
