//! Domain service for the account lifecycle.
//!
//! Create, update, soft-delete, restore and purge, with the cross-account
//! rules the store cannot enforce per row: an actor never deletes itself and
//! at least one enabled, non-deleted administrator always remains.

use serde::Serialize;
use thiserror::Error;

use crate::db::WriteError;
use crate::domain::{AccountId, ActorContext, AdminAction, ErrorKind};
use crate::models::account::{
    Account, AccountChanges, AccountFilter, AccountPage, AccountStats, BulkRestoreOutcome,
    NewAccount,
};

pub const MAX_IDENTIFIER_LEN: usize = 50;
pub const MIN_SECRET_LEN: usize = 8;
pub const MAX_SECRET_LEN: usize = 128;
pub const MAX_DISPLAY_NAME_LEN: usize = 150;
pub const MAX_BULK_IDS: usize = 100;

/// Errors specific to lifecycle operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Login identifier '{0}' is already in use by an active account")]
    IdentifierConflict(String),

    #[error("You cannot delete your own account")]
    CannotDeleteSelf,

    #[error("{}", .0.message())]
    LastAdmin(AdminAction),

    #[error("Deleted accounts cannot be updated. Restore the account first.")]
    CannotUpdateDeleted,

    #[error("Account {0} not found")]
    NotFound(AccountId),

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

impl AccountError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::IdentifierConflict(_) => ErrorKind::IdentifierConflict,
            Self::CannotDeleteSelf => ErrorKind::CannotDeleteSelf,
            Self::LastAdmin(_) => ErrorKind::LastAdmin,
            Self::CannotUpdateDeleted => ErrorKind::CannotUpdateDeleted,
            Self::NotFound(_) => ErrorKind::AccountNotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Input field the failure is attributed to, if any.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::IdentifierConflict(_) => Some("login_identifier"),
            Self::Validation { field, .. } => *field,
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl AccountError {
    pub(crate) fn from_write(err: WriteError, identifier: &str) -> Self {
        match err {
            WriteError::IdentifierInUse => Self::IdentifierConflict(identifier.to_string()),
            WriteError::Database(e) => e.into(),
        }
    }
}

/// Active administrator count and whether one more may be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminCount {
    pub count: u64,
    pub can_delete: bool,
}

/// Domain service trait for account lifecycle management.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Hashes the secret and inserts the account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::IdentifierConflict`] if an active account holds
    /// the identifier, including when a concurrent insert wins the race.
    async fn create(&self, actor: &ActorContext, input: NewAccount)
    -> Result<Account, AccountError>;

    /// Applies a partial update to an active account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::CannotUpdateDeleted`] for soft-deleted accounts
    /// and [`AccountError::LastAdmin`] when demoting or disabling the last
    /// active administrator.
    async fn update(
        &self,
        actor: &ActorContext,
        id: AccountId,
        changes: AccountChanges,
    ) -> Result<Account, AccountError>;

    /// Soft-deletes one account.
    async fn delete(&self, actor: &ActorContext, id: AccountId) -> Result<Account, AccountError>;

    /// Soft-deletes every listed account that is not already deleted, in one
    /// statement. Returns the number of accounts deleted.
    async fn bulk_delete(&self, actor: &ActorContext, ids: &[AccountId])
    -> Result<u64, AccountError>;

    /// Brings a soft-deleted account back.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if the account is missing or not
    /// deleted and [`AccountError::IdentifierConflict`] if the identifier has
    /// been taken by an active account in the meantime.
    async fn restore(&self, actor: &ActorContext, id: AccountId) -> Result<Account, AccountError>;

    /// Restores each account independently; one conflict does not undo the others.
    async fn bulk_restore(
        &self,
        actor: &ActorContext,
        ids: &[AccountId],
    ) -> Result<BulkRestoreOutcome, AccountError>;

    /// Permanently removes accounts soft-deleted at least `days` days ago.
    async fn purge_older_than(&self, actor: &ActorContext, days: u32)
    -> Result<u64, AccountError>;

    /// Number of accounts [`Self::purge_older_than`] would remove.
    async fn count_purgeable(&self, days: u32) -> Result<u64, AccountError>;

    /// Any account, soft-deleted or not.
    async fn get(&self, id: AccountId) -> Result<Account, AccountError>;

    async fn find_active_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, AccountError>;

    /// Every account that has held `identifier`, newest first.
    async fn history(&self, identifier: &str) -> Result<Vec<Account>, AccountError>;

    async fn list(
        &self,
        filter: AccountFilter,
        page: u64,
        page_size: u64,
    ) -> Result<AccountPage, AccountError>;

    async fn list_deleted(&self, page: u64, page_size: u64) -> Result<AccountPage, AccountError>;

    async fn stats(&self) -> Result<AccountStats, AccountError>;

    async fn admin_count(&self) -> Result<AdminCount, AccountError>;
}

/// Trims and checks a login identifier.
pub fn normalize_identifier(raw: &str) -> Result<String, AccountError> {
    let identifier = raw.trim();
    if identifier.is_empty() {
        return Err(AccountError::validation(
            "login_identifier",
            "Login identifier is required",
        ));
    }
    if identifier.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(AccountError::validation(
            "login_identifier",
            format!("Login identifier must be {MAX_IDENTIFIER_LEN} characters or less"),
        ));
    }
    Ok(identifier.to_string())
}

pub fn validate_secret(secret: &str) -> Result<(), AccountError> {
    let len = secret.chars().count();
    if len < MIN_SECRET_LEN {
        return Err(AccountError::validation(
            "secret",
            format!("Password must be at least {MIN_SECRET_LEN} characters"),
        ));
    }
    if len > MAX_SECRET_LEN {
        return Err(AccountError::validation(
            "secret",
            format!("Password must be {MAX_SECRET_LEN} characters or less"),
        ));
    }
    Ok(())
}

/// Trimmed lowercase address; blank means no address.
pub fn normalize_email(raw: Option<&str>) -> Result<Option<String>, AccountError> {
    let Some(email) = raw.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };

    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid || email.contains(char::is_whitespace) {
        return Err(AccountError::validation("email", "Enter a valid email address"));
    }

    Ok(Some(email.to_lowercase()))
}

/// Trimmed display name; blank means none.
pub fn normalize_display_name(raw: Option<&str>) -> Result<Option<String>, AccountError> {
    let Some(name) = raw.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(AccountError::validation(
            "display_name",
            format!("Display name must be {MAX_DISPLAY_NAME_LEN} characters or less"),
        ));
    }
    Ok(Some(name.to_string()))
}

/// Deduplicates a bulk id list, keeping first-seen order.
pub fn dedupe_ids(ids: &[AccountId]) -> Result<Vec<i32>, AccountError> {
    if ids.is_empty() {
        return Err(AccountError::validation("ids", "At least one id is required"));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(AccountError::validation(
            "ids",
            format!("At most {MAX_BULK_IDS} ids can be processed at once"),
        ));
    }

    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    Ok(ids
        .iter()
        .map(|id| id.value())
        .filter(|id| seen.insert(*id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_trimmed_and_bounded() {
        assert_eq!(normalize_identifier("  1000 ").unwrap(), "1000");
        assert!(normalize_identifier("   ").is_err());
        assert!(normalize_identifier(&"x".repeat(50)).is_ok());

        let err = normalize_identifier(&"x".repeat(51)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.field(), Some("login_identifier"));
    }

    #[test]
    fn secret_length_bounds() {
        assert!(validate_secret("short").is_err());
        assert!(validate_secret("12345678").is_ok());
        assert!(validate_secret(&"p".repeat(128)).is_ok());
        assert!(validate_secret(&"p".repeat(129)).is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            normalize_email(Some("  Jane.Doe@Example.COM ")).unwrap(),
            Some("jane.doe@example.com".to_string())
        );
        assert_eq!(normalize_email(Some("   ")).unwrap(), None);
        assert_eq!(normalize_email(None).unwrap(), None);
        assert!(normalize_email(Some("not-an-email")).is_err());
    }

    #[test]
    fn bulk_ids_are_deduplicated() {
        let ids = [3, 1, 3, 2, 1].map(AccountId::new);
        assert_eq!(dedupe_ids(&ids).unwrap(), vec![3, 1, 2]);
        assert!(dedupe_ids(&[]).is_err());

        let too_many: Vec<AccountId> = (1..=101).map(AccountId::new).collect();
        assert!(dedupe_ids(&too_many).is_err());
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            AccountError::LastAdmin(AdminAction::Demote).kind(),
            ErrorKind::LastAdmin
        );
        assert_eq!(
            AccountError::IdentifierConflict("1000".into()).field(),
            Some("login_identifier")
        );
        assert_eq!(
            AccountError::NotFound(AccountId::new(1)).kind(),
            ErrorKind::AccountNotFound
        );
        assert!(
            AccountError::LastAdmin(AdminAction::Delete)
                .to_string()
                .contains("cannot be deleted")
        );
    }
}
