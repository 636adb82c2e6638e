//! Resolves a submitted identifier and secret to an account.
//!
//! Answers only whether the credentials match some account. Enablement and
//! deletion policy belong to the caller.

use tracing::{debug, error};

use crate::config::DeletedLoginPolicy;
use crate::db::Store;
use crate::models::account::Account;
use crate::services::password::SecretHasher;

#[derive(Clone)]
pub struct CredentialVerifier {
    store: Store,
    hasher: SecretHasher,
    policy: DeletedLoginPolicy,
}

impl CredentialVerifier {
    #[must_use]
    pub const fn new(store: Store, hasher: SecretHasher, policy: DeletedLoginPolicy) -> Self {
        Self {
            store,
            hasher,
            policy,
        }
    }

    /// Returns the matching account, or `None`. Unknown identifiers, wrong
    /// secrets and store failures are indistinguishable to the caller. With
    /// [`DeletedLoginPolicy::ReportDeleted`] the match may be a soft-deleted
    /// account.
    pub async fn authenticate(&self, identifier: &str, secret: &str) -> Option<Account> {
        if identifier.is_empty() || secret.is_empty() {
            return None;
        }

        let Some((account, hash)) = self.resolve(identifier).await else {
            self.hasher.dummy_verify(secret).await;
            return None;
        };

        if self.hasher.verify(secret, &hash).await {
            Some(account)
        } else {
            None
        }
    }

    async fn resolve(&self, identifier: &str) -> Option<(Account, String)> {
        let repo = self.store.accounts();

        match repo.find_active_credentials(identifier).await {
            Ok(Some(found)) => return Some(found),
            Ok(None) => {}
            Err(e) => {
                error!(error = ?e, "Credential lookup failed");
                return None;
            }
        }

        if self.policy != DeletedLoginPolicy::ReportDeleted {
            return None;
        }

        match repo.find_latest_deleted_credentials(identifier).await {
            Ok(found) => {
                if found.is_some() {
                    debug!("Identifier resolved to a soft-deleted account");
                }
                found
            }
            Err(e) => {
                error!(error = ?e, "Deleted credential lookup failed");
                None
            }
        }
    }
}
