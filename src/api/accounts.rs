//! Administrative account lifecycle endpoints.
//!
//! Every route here sits behind the session and admin guards; handlers only
//! translate HTTP shapes and delegate to [`crate::services::AccountService`].

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::Authenticated;
use super::validation::{
    validate_account_id, validate_identifier_query, validate_page, validate_page_size,
};
use super::{
    AccountDto, AccountListQuery, ApiError, ApiResponse, AppState, AuditLogDto,
    BulkDeleteResponse, BulkIdsRequest, BulkRestoreResponse, PageDto, PageQuery, PurgeRequest,
    PurgeResponse,
};
use crate::models::account::{AccountChanges, AccountFilter, AccountStats, NewAccount};
use crate::services::AdminCount;

/// GET /accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<ApiResponse<PageDto<AccountDto>>>, ApiError> {
    let page = validate_page(query.page)?;
    let page_size = validate_page_size(query.page_size)?;

    let filter = AccountFilter {
        search: query.search,
        is_admin: query.is_admin,
        is_enabled: query.is_enabled,
    };

    let result = state.accounts().list(filter, page, page_size).await?;
    Ok(Json(ApiResponse::success(PageDto::from(result))))
}

/// POST /accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    Json(payload): Json<NewAccount>,
) -> Result<(StatusCode, Json<ApiResponse<AccountDto>>), ApiError> {
    let account = state.accounts().create(&auth.actor, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AccountDto::from(account))),
    ))
}

/// GET /accounts/{id}
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let id = validate_account_id(id)?;
    let account = state.accounts().get(id).await?;
    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// PATCH /accounts/{id}
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    Path(id): Path<i32>,
    Json(changes): Json<AccountChanges>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let id = validate_account_id(id)?;
    let account = state.accounts().update(&auth.actor, id, changes).await?;
    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// DELETE /accounts/{id}
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let id = validate_account_id(id)?;
    let account = state.accounts().delete(&auth.actor, id).await?;
    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// POST /accounts/{id}/restore
pub async fn restore_account(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let id = validate_account_id(id)?;
    let account = state.accounts().restore(&auth.actor, id).await?;
    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// POST /accounts/bulk-delete
pub async fn bulk_delete(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<Json<ApiResponse<BulkDeleteResponse>>, ApiError> {
    let deleted = state
        .accounts()
        .bulk_delete(&auth.actor, &payload.ids)
        .await?;
    Ok(Json(ApiResponse::success(BulkDeleteResponse { deleted })))
}

/// POST /accounts/bulk-restore
pub async fn bulk_restore(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<Json<ApiResponse<BulkRestoreResponse>>, ApiError> {
    let outcome = state
        .accounts()
        .bulk_restore(&auth.actor, &payload.ids)
        .await?;

    Ok(Json(ApiResponse::success(BulkRestoreResponse {
        restored_count: outcome.restored_count(),
        restored: outcome.restored,
        conflicts: outcome.conflicts,
        not_found: outcome.not_found,
    })))
}

/// GET /accounts/deleted
pub async fn list_deleted(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageDto<AccountDto>>>, ApiError> {
    let page = validate_page(query.page)?;
    let page_size = validate_page_size(query.page_size)?;

    let result = state.accounts().list_deleted(page, page_size).await?;
    Ok(Json(ApiResponse::success(PageDto::from(result))))
}

/// GET /accounts/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<AccountStats>>, ApiError> {
    let stats = state.accounts().stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /accounts/admin-count
pub async fn get_admin_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<AdminCount>>, ApiError> {
    let count = state.accounts().admin_count().await?;
    Ok(Json(ApiResponse::success(count)))
}

/// GET /accounts/history/{identifier}
///
/// Every account that ever held the identifier, newest first.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> Result<Json<ApiResponse<Vec<AccountDto>>>, ApiError> {
    let identifier = validate_identifier_query(&identifier)?;
    let accounts = state.accounts().history(identifier).await?;
    Ok(Json(ApiResponse::success(
        accounts.into_iter().map(AccountDto::from).collect(),
    )))
}

/// POST /accounts/purge
pub async fn purge(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    Json(payload): Json<PurgeRequest>,
) -> Result<Json<ApiResponse<PurgeResponse>>, ApiError> {
    let days = match payload.days {
        Some(days) => days,
        None => state.config().read().await.lifecycle.purge_retention_days,
    };

    let count = if payload.dry_run {
        state.accounts().count_purgeable(days).await?
    } else {
        state.accounts().purge_older_than(&auth.actor, days).await?
    };

    Ok(Json(ApiResponse::success(PurgeResponse {
        days,
        dry_run: payload.dry_run,
        count,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// GET /accounts/{id}/audit
pub async fn get_account_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageDto<AuditLogDto>>>, ApiError> {
    let id = validate_account_id(id)?;
    let page = validate_page(query.page)?;
    let page_size = audit_page_size(query.page_size)?;

    let (items, total) = state
        .store()
        .audit_for_account(id.value(), page, page_size)
        .await?;

    Ok(Json(ApiResponse::success(audit_page(
        items, total, page, page_size,
    ))))
}

/// GET /audit
pub async fn list_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<PageDto<AuditLogDto>>>, ApiError> {
    let page = validate_page(query.page)?;
    let page_size = audit_page_size(query.page_size)?;
    let action = query
        .action
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_uppercase);

    let (items, total) = state
        .store()
        .recent_audit(action.as_deref(), page, page_size)
        .await?;

    Ok(Json(ApiResponse::success(audit_page(
        items, total, page, page_size,
    ))))
}

fn audit_page_size(page_size: Option<u64>) -> Result<u64, ApiError> {
    Ok(match validate_page_size(page_size)? {
        0 => 50,
        size => size,
    })
}

fn audit_page(
    items: Vec<crate::db::AuditLog>,
    total: u64,
    page: u64,
    page_size: u64,
) -> PageDto<AuditLogDto> {
    PageDto {
        items: items.into_iter().map(AuditLogDto::from).collect(),
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
    }
}
