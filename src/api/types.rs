use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, ErrorKind};
use crate::models::account::{Account, AccountPage};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
            field: None,
        }
    }

    pub fn failure(
        message: impl Into<String>,
        kind: ErrorKind,
        field: Option<&'static str>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: Some(kind.code()),
            field,
        }
    }
}

/// Account as exposed over HTTP.
#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub id: AccountId,
    pub login_identifier: String,
    pub display_name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_enabled: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub soft_deleted_at: Option<DateTime<Utc>>,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            display_name: account.display_label().to_string(),
            id: account.id,
            is_deleted: account.is_soft_deleted(),
            login_identifier: account.login_identifier,
            email: account.email,
            is_admin: account.is_admin,
            is_enabled: account.is_enabled,
            created_at: account.created_at,
            updated_at: account.updated_at,
            soft_deleted_at: account.soft_deleted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageDto<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl From<AccountPage> for PageDto<AccountDto> {
    fn from(page: AccountPage) -> Self {
        Self {
            items: page.items.into_iter().map(AccountDto::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountListQuery {
    pub search: Option<String>,
    pub is_admin: Option<bool>,
    pub is_enabled: Option<bool>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkIdsRequest {
    pub ids: Vec<AccountId>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct BulkRestoreResponse {
    pub restored_count: usize,
    pub restored: Vec<AccountId>,
    pub conflicts: Vec<AccountId>,
    pub not_found: Vec<AccountId>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub days: Option<u32>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub days: u32,
    pub dry_run: bool,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct AuditLogDto {
    pub id: i64,
    pub action: String,
    pub actor_account_id: Option<i32>,
    pub target_account_id: Option<i32>,
    pub login_identifier: Option<String>,
    pub request_id: Option<String>,
    pub changes: Option<serde_json::Value>,
    pub success: bool,
    pub occurred_at: DateTime<Utc>,
}

impl From<crate::db::AuditLog> for AuditLogDto {
    fn from(log: crate::db::AuditLog) -> Self {
        Self {
            id: log.id,
            action: log.action,
            actor_account_id: log.actor_account_id,
            target_account_id: log.target_account_id,
            login_identifier: log.login_identifier,
            request_id: log.request_id,
            changes: log
                .changes
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            success: log.success,
            occurred_at: log.occurred_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
