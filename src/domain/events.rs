//! Audit events produced by the lifecycle and login flows.
//!
//! The producers only build these values; where they end up is decided by the
//! `AuditEmitter` wired into the services.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AccountId, ActorContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    SoftDelete,
    Restore,
    BulkDelete,
    BulkRestore,
    Purge,
    Login,
    LoginFailed,
    Logout,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::SoftDelete => "SOFT_DELETE",
            Self::Restore => "RESTORE",
            Self::BulkDelete => "BULK_DELETE",
            Self::BulkRestore => "BULK_RESTORE",
            Self::Purge => "PURGE",
            Self::Login => "LOGIN",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Logout => "LOGOUT",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub actor: Option<AccountId>,
    pub target_account_id: Option<AccountId>,
    pub login_identifier: Option<String>,
    pub request_id: Option<String>,
    pub changes: serde_json::Value,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    #[must_use]
    pub fn new(action: AuditAction, actor: &ActorContext) -> Self {
        Self {
            action,
            actor: actor.account_id,
            target_account_id: None,
            login_identifier: None,
            request_id: actor.request_id.clone(),
            changes: serde_json::Value::Null,
            success: true,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub const fn target(mut self, id: AccountId) -> Self {
        self.target_account_id = Some(id);
        self
    }

    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.login_identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn changes(mut self, changes: serde_json::Value) -> Self {
        self.changes = changes;
        self
    }

    #[must_use]
    pub const fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}
