//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::TransactionTrait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{AccountRepository, AccountUpdate, NewAccountRow, Store, WriteError};
use crate::domain::events::{AuditAction, AuditEvent};
use crate::domain::{AccountId, ActorContext, AdminAction};
use crate::models::account::{
    Account, AccountChanges, AccountFilter, AccountPage, AccountStats, BulkRestoreOutcome,
    NewAccount,
};
use crate::services::account_service::{
    AccountError, AccountService, AdminCount, dedupe_ids, normalize_display_name,
    normalize_email, normalize_identifier, validate_secret,
};
use crate::services::audit::AuditEmitter;
use crate::services::password::SecretHasher;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

pub struct SeaOrmAccountService {
    store: Store,
    hasher: SecretHasher,
    audit: Arc<dyn AuditEmitter>,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(store: Store, hasher: SecretHasher, audit: Arc<dyn AuditEmitter>) -> Self {
        Self {
            store,
            hasher,
            audit,
        }
    }

    async fn record(&self, event: AuditEvent) {
        metrics::counter!("account_lifecycle_total", "action" => event.action.as_str())
            .increment(1);
        self.audit.emit(event).await;
    }

    fn page_bounds(page: u64, page_size: u64) -> (u64, u64) {
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        (page.max(1), page_size)
    }
}

/// Rejects `action` if no enabled, non-deleted administrator would remain
/// outside `excluded`. Must run on the same transaction as the write.
async fn ensure_other_admin<C: sea_orm::ConnectionTrait>(
    repo: &AccountRepository<'_, C>,
    excluded: &[i32],
    action: AdminAction,
) -> Result<(), AccountError> {
    let remaining = repo.count_active_admins_excluding(excluded).await?;
    if remaining == 0 {
        debug!(?action, "Refusing to remove the last active administrator");
        return Err(AccountError::LastAdmin(action));
    }
    Ok(())
}

fn to_page(items: Vec<Account>, total: u64, page: u64, page_size: u64) -> AccountPage {
    AccountPage {
        items,
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
    }
}

fn ids_json(ids: &[AccountId]) -> Value {
    Value::from(ids.iter().map(|id| id.value()).collect::<Vec<_>>())
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn create(
        &self,
        actor: &ActorContext,
        input: NewAccount,
    ) -> Result<Account, AccountError> {
        let identifier = normalize_identifier(&input.login_identifier)?;
        validate_secret(&input.secret)?;
        let display_name = normalize_display_name(input.display_name.as_deref())?;
        let email = normalize_email(input.email.as_deref())?;

        let secret_hash = self.hasher.hash(&input.secret).await?;

        let row = NewAccountRow {
            login_identifier: identifier.clone(),
            display_name,
            email,
            secret_hash,
            is_admin: input.is_admin,
            is_enabled: input.is_enabled,
        };

        let account = self
            .store
            .accounts()
            .insert(row)
            .await
            .map_err(|e| AccountError::from_write(e, &identifier))?;

        info!(
            event = "account_created",
            account_id = account.id.value(),
            is_admin = account.is_admin,
            "Account created"
        );

        self.record(
            AuditEvent::new(AuditAction::Create, actor)
                .target(account.id)
                .identifier(&account.login_identifier)
                .changes(json!({
                    "login_identifier": account.login_identifier,
                    "display_name": account.display_name,
                    "email": account.email,
                    "is_admin": account.is_admin,
                    "is_enabled": account.is_enabled,
                })),
        )
        .await;

        Ok(account)
    }

    async fn update(
        &self,
        actor: &ActorContext,
        id: AccountId,
        changes: AccountChanges,
    ) -> Result<Account, AccountError> {
        let identifier = changes
            .login_identifier
            .as_deref()
            .map(normalize_identifier)
            .transpose()?;
        let display_name = changes
            .display_name
            .as_deref()
            .map(|name| normalize_display_name(Some(name)))
            .transpose()?;
        let email = changes
            .email
            .as_deref()
            .map(|email| normalize_email(Some(email)))
            .transpose()?;
        let secret = changes.secret.as_deref().filter(|s| !s.is_empty());
        if let Some(secret) = secret {
            validate_secret(secret)?;
        }

        // Hashing stays outside the transaction.
        let secret_hash = match secret {
            Some(secret) => Some(self.hasher.hash(secret).await?),
            None => None,
        };

        let txn = self.store.begin().await?;
        let repo = AccountRepository::new(&txn);

        let current = repo
            .find_by_id(id.value())
            .await?
            .ok_or(AccountError::NotFound(id))?;

        if current.is_soft_deleted() {
            return Err(AccountError::CannotUpdateDeleted);
        }

        if current.is_admin {
            if changes.revokes_admin(&current) {
                ensure_other_admin(&repo, &[id.value()], AdminAction::Demote).await?;
            } else if changes.disables(&current) {
                ensure_other_admin(&repo, &[id.value()], AdminAction::Deactivate).await?;
            }
        }

        let mut diff = Map::new();
        if let Some(new) = identifier.as_ref().filter(|v| **v != current.login_identifier) {
            diff.insert(
                "login_identifier".into(),
                json!({ "old": current.login_identifier, "new": new }),
            );
        }
        if let Some(new) = display_name.as_ref().filter(|v| **v != current.display_name) {
            diff.insert(
                "display_name".into(),
                json!({ "old": current.display_name, "new": new }),
            );
        }
        if let Some(new) = email.as_ref().filter(|v| **v != current.email) {
            diff.insert("email".into(), json!({ "old": current.email, "new": new }));
        }
        if let Some(new) = changes.is_admin.filter(|v| *v != current.is_admin) {
            diff.insert(
                "is_admin".into(),
                json!({ "old": current.is_admin, "new": new }),
            );
        }
        if let Some(new) = changes.is_enabled.filter(|v| *v != current.is_enabled) {
            diff.insert(
                "is_enabled".into(),
                json!({ "old": current.is_enabled, "new": new }),
            );
        }
        if secret_hash.is_some() {
            diff.insert("secret".into(), Value::from("changed"));
        }

        let update = AccountUpdate {
            login_identifier: identifier,
            display_name,
            email,
            secret_hash,
            is_admin: changes.is_admin,
            is_enabled: changes.is_enabled,
        };

        let conflict_identifier = update
            .login_identifier
            .clone()
            .unwrap_or_else(|| current.login_identifier.clone());
        let account = repo
            .update(id.value(), update)
            .await
            .map_err(|e| AccountError::from_write(e, &conflict_identifier))?;

        txn.commit().await?;

        self.record(
            AuditEvent::new(AuditAction::Update, actor)
                .target(account.id)
                .identifier(&account.login_identifier)
                .changes(Value::Object(diff)),
        )
        .await;

        Ok(account)
    }

    async fn delete(&self, actor: &ActorContext, id: AccountId) -> Result<Account, AccountError> {
        if actor.account_id == Some(id) {
            return Err(AccountError::CannotDeleteSelf);
        }

        let txn = self.store.begin().await?;
        let repo = AccountRepository::new(&txn);

        let current = repo
            .find_by_id(id.value())
            .await?
            .filter(|account| !account.is_soft_deleted())
            .ok_or(AccountError::NotFound(id))?;

        if current.is_admin {
            ensure_other_admin(&repo, &[id.value()], AdminAction::Delete).await?;
        }

        let now = Utc::now();
        repo.soft_delete(&[id.value()], now).await?;
        let account = repo
            .find_by_id(id.value())
            .await?
            .ok_or(AccountError::NotFound(id))?;

        txn.commit().await?;

        info!(
            event = "account_soft_deleted",
            account_id = id.value(),
            "Account soft-deleted"
        );

        self.record(
            AuditEvent::new(AuditAction::SoftDelete, actor)
                .target(id)
                .identifier(&account.login_identifier)
                .changes(json!({ "soft_deleted_at": now, "is_enabled": false })),
        )
        .await;

        Ok(account)
    }

    async fn bulk_delete(
        &self,
        actor: &ActorContext,
        ids: &[AccountId],
    ) -> Result<u64, AccountError> {
        let ids = dedupe_ids(ids)?;
        if actor
            .account_id
            .is_some_and(|me| ids.contains(&me.value()))
        {
            return Err(AccountError::CannotDeleteSelf);
        }

        let txn = self.store.begin().await?;
        let repo = AccountRepository::new(&txn);

        let targets: Vec<Account> = repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .filter(|account| !account.is_soft_deleted())
            .collect();

        if targets.is_empty() {
            return Ok(0);
        }

        if targets.iter().any(|account| account.is_admin) {
            ensure_other_admin(&repo, &ids, AdminAction::Delete).await?;
        }

        let target_ids: Vec<i32> = targets.iter().map(|a| a.id.value()).collect();
        let deleted = repo.soft_delete(&target_ids, Utc::now()).await?;

        txn.commit().await?;

        info!(
            event = "accounts_bulk_deleted",
            count = deleted,
            "Accounts soft-deleted"
        );

        let deleted_ids: Vec<AccountId> = targets.iter().map(|a| a.id).collect();
        self.record(
            AuditEvent::new(AuditAction::BulkDelete, actor).changes(json!({
                "ids": ids_json(&deleted_ids),
                "count": deleted,
            })),
        )
        .await;

        Ok(deleted)
    }

    async fn restore(&self, actor: &ActorContext, id: AccountId) -> Result<Account, AccountError> {
        let txn = self.store.begin().await?;
        let repo = AccountRepository::new(&txn);

        let current = repo
            .find_by_id(id.value())
            .await?
            .filter(Account::is_soft_deleted)
            .ok_or(AccountError::NotFound(id))?;

        match repo.restore(id.value()).await {
            Ok(true) => {}
            Ok(false) => return Err(AccountError::NotFound(id)),
            Err(e) => return Err(AccountError::from_write(e, &current.login_identifier)),
        }

        let account = repo
            .find_by_id(id.value())
            .await?
            .ok_or(AccountError::NotFound(id))?;

        txn.commit().await?;

        info!(
            event = "account_restored",
            account_id = id.value(),
            "Account restored"
        );

        self.record(
            AuditEvent::new(AuditAction::Restore, actor)
                .target(id)
                .identifier(&account.login_identifier)
                .changes(json!({ "soft_deleted_at": null, "is_enabled": true })),
        )
        .await;

        Ok(account)
    }

    async fn bulk_restore(
        &self,
        actor: &ActorContext,
        ids: &[AccountId],
    ) -> Result<BulkRestoreOutcome, AccountError> {
        let ids = dedupe_ids(ids)?;
        let mut outcome = BulkRestoreOutcome::default();

        let txn = self.store.begin().await?;

        for id in ids {
            let account_id = AccountId::new(id);
            let current = AccountRepository::new(&txn).find_by_id(id).await?;
            if !current.as_ref().is_some_and(Account::is_soft_deleted) {
                outcome.not_found.push(account_id);
                continue;
            }

            // One savepoint per row so a conflict only rolls back that row.
            let savepoint = txn.begin().await?;
            match AccountRepository::new(&savepoint).restore(id).await {
                Ok(true) => {
                    savepoint.commit().await?;
                    outcome.restored.push(account_id);
                }
                Ok(false) => {
                    savepoint.rollback().await?;
                    outcome.not_found.push(account_id);
                }
                Err(WriteError::IdentifierInUse) => {
                    savepoint.rollback().await?;
                    outcome.conflicts.push(account_id);
                }
                Err(WriteError::Database(e)) => return Err(e.into()),
            }
        }

        txn.commit().await?;

        info!(
            event = "accounts_bulk_restored",
            restored = outcome.restored.len(),
            conflicts = outcome.conflicts.len(),
            not_found = outcome.not_found.len(),
            "Bulk restore finished"
        );

        self.record(
            AuditEvent::new(AuditAction::BulkRestore, actor).changes(json!({
                "restored": ids_json(&outcome.restored),
                "conflicts": ids_json(&outcome.conflicts),
                "not_found": ids_json(&outcome.not_found),
            })),
        )
        .await;

        Ok(outcome)
    }

    async fn purge_older_than(
        &self,
        actor: &ActorContext,
        days: u32,
    ) -> Result<u64, AccountError> {
        if days == 0 {
            return Err(AccountError::validation("days", "Retention must be at least one day"));
        }

        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        let purged = self.store.accounts().purge_deleted_before(cutoff).await?;

        metrics::counter!("accounts_purged_total").increment(purged);
        info!(
            event = "accounts_purged",
            count = purged,
            retention_days = days,
            "Purged soft-deleted accounts"
        );

        self.record(
            AuditEvent::new(AuditAction::Purge, actor).changes(json!({
                "retention_days": days,
                "cutoff": cutoff,
                "count": purged,
            })),
        )
        .await;

        Ok(purged)
    }

    async fn count_purgeable(&self, days: u32) -> Result<u64, AccountError> {
        if days == 0 {
            return Err(AccountError::validation("days", "Retention must be at least one day"));
        }

        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        Ok(self.store.accounts().count_deleted_before(cutoff).await?)
    }

    async fn get(&self, id: AccountId) -> Result<Account, AccountError> {
        self.store
            .accounts()
            .find_by_id(id.value())
            .await?
            .ok_or(AccountError::NotFound(id))
    }

    async fn find_active_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, AccountError> {
        Ok(self
            .store
            .accounts()
            .find_active_by_identifier(identifier.trim())
            .await?)
    }

    async fn history(&self, identifier: &str) -> Result<Vec<Account>, AccountError> {
        let identifier = normalize_identifier(identifier)?;
        Ok(self.store.accounts().find_all_by_identifier(&identifier).await?)
    }

    async fn list(
        &self,
        filter: AccountFilter,
        page: u64,
        page_size: u64,
    ) -> Result<AccountPage, AccountError> {
        let (page, page_size) = Self::page_bounds(page, page_size);
        let (items, total) = self
            .store
            .accounts()
            .list_active(&filter, page, page_size)
            .await?;
        Ok(to_page(items, total, page, page_size))
    }

    async fn list_deleted(&self, page: u64, page_size: u64) -> Result<AccountPage, AccountError> {
        let (page, page_size) = Self::page_bounds(page, page_size);
        let (items, total) = self.store.accounts().list_deleted(page, page_size).await?;
        Ok(to_page(items, total, page, page_size))
    }

    async fn stats(&self) -> Result<AccountStats, AccountError> {
        Ok(self.store.accounts().stats().await?)
    }

    async fn admin_count(&self) -> Result<AdminCount, AccountError> {
        let count = self
            .store
            .accounts()
            .count_active_admins_excluding(&[])
            .await?;
        Ok(AdminCount {
            count,
            can_delete: count > 1,
        })
    }
}
