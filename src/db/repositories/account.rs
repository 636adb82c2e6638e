use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};

use crate::entities::{accounts, prelude::*};
use crate::models::account::{Account, AccountFilter, AccountStats};

/// Failure of a write that can collide with the active-identifier index.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("login identifier is already held by an active account")]
    IdentifierInUse,

    #[error("database error: {0}")]
    Database(#[source] DbErr),
}

impl From<DbErr> for WriteError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::IdentifierInUse,
            _ => Self::Database(err),
        }
    }
}

/// Row to insert. `secret_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccountRow {
    pub login_identifier: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub secret_hash: String,
    pub is_admin: bool,
    pub is_enabled: bool,
}

/// Column-level update. Outer `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub login_identifier: Option<String>,
    pub display_name: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub secret_hash: Option<String>,
    pub is_admin: Option<bool>,
    pub is_enabled: Option<bool>,
}

/// Account queries over either a pooled connection or an open transaction.
pub struct AccountRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AccountRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, row: NewAccountRow) -> Result<Account, WriteError> {
        let now = Utc::now();
        let active = accounts::ActiveModel {
            login_identifier: Set(row.login_identifier),
            display_name: Set(row.display_name),
            email: Set(row.email),
            secret_hash: Set(row.secret_hash),
            is_admin: Set(row.is_admin),
            is_enabled: Set(row.is_enabled),
            created_at: Set(now),
            updated_at: Set(now),
            soft_deleted_at: Set(None),
            ..Default::default()
        };

        let model = active.insert(self.conn).await?;
        Ok(Account::from(model))
    }

    /// At most one row can match thanks to the partial unique index.
    pub async fn find_active_by_identifier(&self, identifier: &str) -> Result<Option<Account>> {
        let model = Accounts::find()
            .filter(accounts::Column::LoginIdentifier.eq(identifier))
            .filter(accounts::Column::SoftDeletedAt.is_null())
            .one(self.conn)
            .await
            .context("Failed to query active account by identifier")?;

        Ok(model.map(Account::from))
    }

    /// Active account together with its secret hash, for credential checks.
    pub async fn find_active_credentials(
        &self,
        identifier: &str,
    ) -> Result<Option<(Account, String)>> {
        let model = Accounts::find()
            .filter(accounts::Column::LoginIdentifier.eq(identifier))
            .filter(accounts::Column::SoftDeletedAt.is_null())
            .one(self.conn)
            .await
            .context("Failed to query account credentials")?;

        Ok(model.map(with_hash))
    }

    /// Most recently created soft-deleted account with its secret hash.
    pub async fn find_latest_deleted_credentials(
        &self,
        identifier: &str,
    ) -> Result<Option<(Account, String)>> {
        let model = Accounts::find()
            .filter(accounts::Column::LoginIdentifier.eq(identifier))
            .filter(accounts::Column::SoftDeletedAt.is_not_null())
            .order_by_desc(accounts::Column::CreatedAt)
            .order_by_desc(accounts::Column::Id)
            .one(self.conn)
            .await
            .context("Failed to query deleted account credentials")?;

        Ok(model.map(with_hash))
    }

    /// Every account that has ever held `identifier`, newest first.
    pub async fn find_all_by_identifier(&self, identifier: &str) -> Result<Vec<Account>> {
        let models = Accounts::find()
            .filter(accounts::Column::LoginIdentifier.eq(identifier))
            .order_by_desc(accounts::Column::CreatedAt)
            .order_by_desc(accounts::Column::Id)
            .all(self.conn)
            .await
            .context("Failed to query account history by identifier")?;

        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Includes soft-deleted rows. For administrative reads.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Account>> {
        let model = Accounts::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query account by ID")?;

        Ok(model.map(Account::from))
    }

    /// Never returns a soft-deleted row. Session restoration goes through here.
    pub async fn find_active_by_id(&self, id: i32) -> Result<Option<Account>> {
        let model = Accounts::find_by_id(id)
            .filter(accounts::Column::SoftDeletedAt.is_null())
            .one(self.conn)
            .await
            .context("Failed to query active account by ID")?;

        Ok(model.map(Account::from))
    }

    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Account>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = Accounts::find()
            .filter(accounts::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(accounts::Column::Id)
            .all(self.conn)
            .await
            .context("Failed to query accounts by IDs")?;

        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Enabled, non-deleted administrators outside `excluded`.
    pub async fn count_active_admins_excluding(&self, excluded: &[i32]) -> Result<u64> {
        let mut query = Accounts::find()
            .filter(accounts::Column::IsAdmin.eq(true))
            .filter(accounts::Column::IsEnabled.eq(true))
            .filter(accounts::Column::SoftDeletedAt.is_null());

        if !excluded.is_empty() {
            query = query.filter(accounts::Column::Id.is_not_in(excluded.iter().copied()));
        }

        query
            .count(self.conn)
            .await
            .context("Failed to count active administrators")
    }

    pub async fn count_all(&self) -> Result<u64> {
        Accounts::find()
            .count(self.conn)
            .await
            .context("Failed to count accounts")
    }

    pub async fn update(&self, id: i32, update: AccountUpdate) -> Result<Account, WriteError> {
        let Some(model) = Accounts::find_by_id(id).one(self.conn).await? else {
            return Err(WriteError::Database(DbErr::RecordNotFound(format!(
                "account {id}"
            ))));
        };

        let mut active: accounts::ActiveModel = model.into();
        if let Some(identifier) = update.login_identifier {
            active.login_identifier = Set(identifier);
        }
        if let Some(display_name) = update.display_name {
            active.display_name = Set(display_name);
        }
        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(hash) = update.secret_hash {
            active.secret_hash = Set(hash);
        }
        if let Some(is_admin) = update.is_admin {
            active.is_admin = Set(is_admin);
        }
        if let Some(is_enabled) = update.is_enabled {
            active.is_enabled = Set(is_enabled);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(self.conn).await?;
        Ok(Account::from(model))
    }

    /// Soft-deletes every listed row that is not already deleted, in one
    /// statement. Returns the number of rows changed.
    pub async fn soft_delete(&self, ids: &[i32], at: DateTime<Utc>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Accounts::update_many()
            .col_expr(accounts::Column::SoftDeletedAt, Expr::value(Some(at)))
            .col_expr(accounts::Column::IsEnabled, Expr::value(false))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(at))
            .filter(accounts::Column::Id.is_in(ids.iter().copied()))
            .filter(accounts::Column::SoftDeletedAt.is_null())
            .exec(self.conn)
            .await
            .context("Failed to soft-delete accounts")?;

        Ok(result.rows_affected)
    }

    /// Clears the deletion mark of a soft-deleted row. `Ok(false)` when the
    /// row is missing or not deleted.
    pub async fn restore(&self, id: i32) -> Result<bool, WriteError> {
        let result = Accounts::update_many()
            .col_expr(
                accounts::Column::SoftDeletedAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(accounts::Column::IsEnabled, Expr::value(true))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(id))
            .filter(accounts::Column::SoftDeletedAt.is_not_null())
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Hard-deletes rows soft-deleted at or before `cutoff`.
    pub async fn purge_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = Accounts::delete_many()
            .filter(accounts::Column::SoftDeletedAt.is_not_null())
            .filter(accounts::Column::SoftDeletedAt.lte(cutoff))
            .exec(self.conn)
            .await
            .context("Failed to purge soft-deleted accounts")?;

        Ok(result.rows_affected)
    }

    pub async fn count_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        Accounts::find()
            .filter(accounts::Column::SoftDeletedAt.is_not_null())
            .filter(accounts::Column::SoftDeletedAt.lte(cutoff))
            .count(self.conn)
            .await
            .context("Failed to count purgeable accounts")
    }

    /// Active accounts, newest first. `page` is 1-based. Returns the page and
    /// the total number of matching rows.
    pub async fn list_active(
        &self,
        filter: &AccountFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Account>, u64)> {
        let mut query = Accounts::find()
            .filter(accounts::Column::SoftDeletedAt.is_null())
            .order_by_desc(accounts::Column::CreatedAt)
            .order_by_desc(accounts::Column::Id);

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(accounts::Column::LoginIdentifier.starts_with(search))
                    .add(accounts::Column::DisplayName.starts_with(search)),
            );
        }
        if let Some(is_admin) = filter.is_admin {
            query = query.filter(accounts::Column::IsAdmin.eq(is_admin));
        }
        if let Some(is_enabled) = filter.is_enabled {
            query = query.filter(accounts::Column::IsEnabled.eq(is_enabled));
        }

        let paginator = query.paginate(self.conn, page_size);
        let total = paginator
            .num_items()
            .await
            .context("Failed to count accounts")?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list accounts")?;

        Ok((items.into_iter().map(Account::from).collect(), total))
    }

    /// Soft-deleted accounts, most recently deleted first.
    pub async fn list_deleted(&self, page: u64, page_size: u64) -> Result<(Vec<Account>, u64)> {
        let paginator = Accounts::find()
            .filter(accounts::Column::SoftDeletedAt.is_not_null())
            .order_by_desc(accounts::Column::SoftDeletedAt)
            .order_by_desc(accounts::Column::Id)
            .paginate(self.conn, page_size);

        let total = paginator
            .num_items()
            .await
            .context("Failed to count deleted accounts")?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list deleted accounts")?;

        Ok((items.into_iter().map(Account::from).collect(), total))
    }

    pub async fn stats(&self) -> Result<AccountStats> {
        let active = || Accounts::find().filter(accounts::Column::SoftDeletedAt.is_null());

        let total = active().count(self.conn).await?;
        let enabled = active()
            .filter(accounts::Column::IsEnabled.eq(true))
            .count(self.conn)
            .await?;
        let active_admins = self.count_active_admins_excluding(&[]).await?;
        let soft_deleted = Accounts::find()
            .filter(accounts::Column::SoftDeletedAt.is_not_null())
            .count(self.conn)
            .await?;

        Ok(AccountStats {
            total,
            enabled,
            disabled: total.saturating_sub(enabled),
            active_admins,
            soft_deleted,
        })
    }
}

fn with_hash(model: accounts::Model) -> (Account, String) {
    let hash = model.secret_hash.clone();
    (Account::from(model), hash)
}
