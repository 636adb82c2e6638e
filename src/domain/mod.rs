//! Domain primitives shared by the store, the services and the HTTP layer.
//!
//! Ids are wrapped in newtypes so an acting account id cannot be confused with
//! a target account id at call sites.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate key of an account. Assigned by the store, never reused.
///
/// # Examples
///
/// ```rust
/// use roster::domain::AccountId;
///
/// let id = AccountId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(i32);

impl AccountId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "AccountId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AccountId> for i32 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl From<i32> for AccountId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for AccountId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Who is performing an operation. Passed explicitly into every lifecycle
/// operation instead of being read from ambient request state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    pub account_id: Option<AccountId>,
    pub request_id: Option<String>,
}

impl ActorContext {
    /// Scheduled jobs, CLI maintenance and bootstrap.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            account_id: None,
            request_id: None,
        }
    }

    #[must_use]
    pub const fn account(id: AccountId) -> Self {
        Self {
            account_id: Some(id),
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Which mutation would have removed the last active administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Delete,
    Demote,
    Deactivate,
}

impl AdminAction {
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Delete => {
                "At least one administrator is required. The last administrator cannot be deleted."
            }
            Self::Demote => {
                "At least one administrator is required. The last administrator cannot lose admin rights."
            }
            Self::Deactivate => {
                "At least one administrator is required. The last administrator cannot be disabled."
            }
        }
    }
}

/// Stable classification of every failure surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    IdentifierConflict,
    CannotDeleteSelf,
    LastAdmin,
    CannotUpdateDeleted,
    AccountNotFound,
    Validation,
    InvalidCredentials,
    Locked,
    AccountDisabled,
    AccountDeleted,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IdentifierConflict => "IDENTIFIER_CONFLICT",
            Self::CannotDeleteSelf => "CANNOT_DELETE_SELF",
            Self::LastAdmin => "LAST_ADMIN",
            Self::CannotUpdateDeleted => "CANNOT_UPDATE_DELETED",
            Self::AccountNotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Locked => "ACCOUNT_LOCKED",
            Self::AccountDisabled => "ACCOUNT_INACTIVE",
            Self::AccountDeleted => "ACCOUNT_DELETED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Expected, user-recoverable conditions. These are audited, not logged
    /// as application errors.
    #[must_use]
    pub const fn is_business_rule(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_roundtrips_through_json() {
        let id = AccountId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn system_actor_has_no_account() {
        let actor = ActorContext::system().with_request_id("req-1");
        assert!(actor.account_id.is_none());
        assert_eq!(actor.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn error_kind_codes_are_stable() {
        assert_eq!(ErrorKind::LastAdmin.code(), "LAST_ADMIN");
        assert_eq!(ErrorKind::AccountNotFound.to_string(), "NOT_FOUND");
        assert!(ErrorKind::CannotDeleteSelf.is_business_rule());
        assert!(!ErrorKind::Internal.is_business_rule());
    }
}
