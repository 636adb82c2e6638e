//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::Store;
use crate::domain::events::{AuditAction, AuditEvent};
use crate::domain::{AccountId, ActorContext};
use crate::models::account::Account;
use crate::services::audit::AuditEmitter;
use crate::services::auth_service::{AuthError, AuthService};
use crate::services::credentials::CredentialVerifier;
use crate::services::lockout::LockoutGovernor;

pub struct SeaOrmAuthService {
    store: Store,
    verifier: CredentialVerifier,
    governor: LockoutGovernor,
    audit: Arc<dyn AuditEmitter>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        verifier: CredentialVerifier,
        governor: LockoutGovernor,
        audit: Arc<dyn AuditEmitter>,
    ) -> Self {
        Self {
            store,
            verifier,
            governor,
            audit,
        }
    }

    /// Counts a failure and locks the identifier once the limit is reached.
    /// Returns the lockout error when this failure triggered it.
    async fn register_failure(&self, identifier: &str) -> Option<AuthError> {
        let attempts = self.governor.record_failure(identifier).await;
        if !self.governor.threshold_reached(attempts) {
            debug!(attempts, "Failed login attempt recorded");
            return None;
        }

        self.governor.lock(identifier).await;
        warn!(
            event = "login_locked",
            attempts,
            lockout_seconds = self.governor.lockout_duration().as_secs(),
            "Identifier locked after repeated failed logins"
        );

        Some(AuthError::Locked {
            retry_after: self.governor.lockout_duration(),
        })
    }

    async fn reject(
        &self,
        actor: &ActorContext,
        identifier: &str,
        target: Option<AccountId>,
        reason: &'static str,
        err: AuthError,
    ) -> AuthError {
        metrics::counter!("login_attempts_total", "outcome" => reason).increment(1);

        let mut event = AuditEvent::new(AuditAction::LoginFailed, actor)
            .identifier(identifier)
            .changes(json!({ "reason": reason }))
            .failed();
        if let Some(id) = target {
            event = event.target(id);
        }
        self.audit.emit(event).await;

        err
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(
        &self,
        actor: &ActorContext,
        identifier: &str,
        secret: &str,
    ) -> Result<Account, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || secret.is_empty() {
            return Err(AuthError::Validation {
                field: None,
                message: "Login identifier and password are required".to_string(),
            });
        }

        if let Some(retry_after) = self.governor.retry_after(identifier).await {
            return Err(self
                .reject(
                    actor,
                    identifier,
                    None,
                    "locked",
                    AuthError::Locked { retry_after },
                )
                .await);
        }

        let Some(account) = self.verifier.authenticate(identifier, secret).await else {
            let err = self
                .register_failure(identifier)
                .await
                .unwrap_or(AuthError::InvalidCredentials);
            return Err(self
                .reject(actor, identifier, None, "invalid_credentials", err)
                .await);
        };

        if account.is_soft_deleted() {
            return Err(self
                .reject(
                    actor,
                    identifier,
                    Some(account.id),
                    "deleted",
                    AuthError::AccountDeleted,
                )
                .await);
        }

        if !account.is_enabled {
            let err = self
                .register_failure(identifier)
                .await
                .unwrap_or(AuthError::AccountDisabled);
            return Err(self
                .reject(actor, identifier, Some(account.id), "disabled", err)
                .await);
        }

        self.governor.clear(identifier).await;

        metrics::counter!("login_attempts_total", "outcome" => "success").increment(1);
        info!(
            event = "login_succeeded",
            account_id = account.id.value(),
            "Login succeeded"
        );

        let actor = ActorContext {
            account_id: Some(account.id),
            request_id: actor.request_id.clone(),
        };
        self.audit
            .emit(
                AuditEvent::new(AuditAction::Login, &actor)
                    .target(account.id)
                    .identifier(&account.login_identifier),
            )
            .await;

        Ok(account)
    }

    async fn session_account(&self, id: AccountId) -> Result<Option<Account>, AuthError> {
        let account = self.store.accounts().find_active_by_id(id.value()).await?;
        Ok(account.filter(|account| account.is_enabled))
    }

    async fn logout(&self, actor: &ActorContext, account: &Account) {
        info!(
            event = "logout",
            account_id = account.id.value(),
            "Logged out"
        );
        self.audit
            .emit(
                AuditEvent::new(AuditAction::Logout, actor)
                    .target(account.id)
                    .identifier(&account.login_identifier),
            )
            .await;
    }
}
