use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::AccountId;
use crate::entities::accounts;

/// Account as seen by everything above the repository. The secret hash never
/// leaves the store through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub login_identifier: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub soft_deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    #[must_use]
    pub const fn is_soft_deleted(&self) -> bool {
        self.soft_deleted_at.is_some()
    }

    /// Counts toward the last-admin invariant.
    #[must_use]
    pub const fn is_active_admin(&self) -> bool {
        self.is_admin && self.is_enabled && !self.is_soft_deleted()
    }

    #[must_use]
    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.login_identifier)
    }
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::new(model.id),
            login_identifier: model.login_identifier,
            display_name: model.display_name,
            email: model.email,
            is_admin: model.is_admin,
            is_enabled: model.is_enabled,
            created_at: model.created_at,
            updated_at: model.updated_at,
            soft_deleted_at: model.soft_deleted_at,
        }
    }
}

/// Input for account creation. `secret` is plaintext and is hashed by the
/// lifecycle service before it reaches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub login_identifier: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub secret: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

const fn default_true() -> bool {
    true
}

/// Partial update. `None` leaves the field untouched; a blank `secret` is
/// treated the same as `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountChanges {
    pub login_identifier: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub secret: Option<String>,
    pub is_admin: Option<bool>,
    pub is_enabled: Option<bool>,
}

impl AccountChanges {
    /// Whether applying these changes takes `account` out of the active admin set.
    #[must_use]
    pub fn revokes_admin(&self, account: &Account) -> bool {
        account.is_admin && self.is_admin == Some(false)
    }

    #[must_use]
    pub fn disables(&self, account: &Account) -> bool {
        account.is_enabled && self.is_enabled == Some(false)
    }
}

/// Filters for the active-account listing.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Prefix match on identifier or display name.
    pub search: Option<String>,
    pub is_admin: Option<bool>,
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountPage {
    pub items: Vec<Account>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountStats {
    pub total: u64,
    pub enabled: u64,
    pub disabled: u64,
    pub active_admins: u64,
    pub soft_deleted: u64,
}

/// Per-row outcome of a best-effort bulk restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkRestoreOutcome {
    pub restored: Vec<AccountId>,
    /// An active account already holds the identifier.
    pub conflicts: Vec<AccountId>,
    /// Missing or not soft-deleted.
    pub not_found: Vec<AccountId>,
}

impl BulkRestoreOutcome {
    #[must_use]
    pub fn restored_count(&self) -> usize {
        self.restored.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(is_admin: bool, is_enabled: bool) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(1),
            login_identifier: "1000".to_string(),
            display_name: None,
            email: None,
            is_admin,
            is_enabled,
            created_at: now,
            updated_at: now,
            soft_deleted_at: None,
        }
    }

    #[test]
    fn display_label_falls_back_to_identifier() {
        let mut account = sample(false, true);
        assert_eq!(account.display_label(), "1000");
        account.display_name = Some("Jane".to_string());
        assert_eq!(account.display_label(), "Jane");
    }

    #[test]
    fn active_admin_requires_enabled_and_not_deleted() {
        assert!(sample(true, true).is_active_admin());
        assert!(!sample(true, false).is_active_admin());

        let mut deleted = sample(true, true);
        deleted.soft_deleted_at = Some(Utc::now());
        assert!(!deleted.is_active_admin());
    }

    #[test]
    fn changes_detect_admin_removal() {
        let admin = sample(true, true);
        let demote = AccountChanges {
            is_admin: Some(false),
            ..Default::default()
        };
        let disable = AccountChanges {
            is_enabled: Some(false),
            ..Default::default()
        };
        assert!(demote.revokes_admin(&admin));
        assert!(!demote.disables(&admin));
        assert!(disable.disables(&admin));
        assert!(!AccountChanges::default().revokes_admin(&admin));
    }
}
