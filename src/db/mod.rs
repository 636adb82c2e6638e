use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, DbErr, IsolationLevel, Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use crate::entities::audit_logs::Model as AuditLog;
pub use repositories::account::{AccountRepository, AccountUpdate, NewAccountRow, WriteError};

const WRITE_LOCK_SQL: &str = "UPDATE write_lock SET generation = generation + 1 WHERE id = 1";

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        if !path_str.starts_with(":memory:") {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        // Readers keep going while a writer holds the lock.
        if conn.get_database_backend() == DatabaseBackend::Sqlite
            && !path_str.starts_with(":memory:")
        {
            conn.execute_unprepared("PRAGMA journal_mode=WAL").await?;
        }

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Opens the transaction every check-then-write runs in.
    ///
    /// On SQLite the write lock is taken before the first read. A deferred
    /// transaction that reads and then writes cannot wait for the lock and
    /// fails with `SQLITE_BUSY`; a write as the first statement waits on the
    /// connection's busy timeout instead.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        match self.conn.get_database_backend() {
            DatabaseBackend::Sqlite => {
                let txn = self.conn.begin().await?;
                txn.execute_unprepared(WRITE_LOCK_SQL).await?;
                Ok(txn)
            }
            _ => {
                self.conn
                    .begin_with_config(Some(IsolationLevel::Serializable), None)
                    .await
            }
        }
    }

    #[must_use]
    pub const fn accounts(&self) -> AccountRepository<'_, DatabaseConnection> {
        AccountRepository::new(&self.conn)
    }

    #[must_use]
    pub fn audit_repo(&self) -> repositories::audit::AuditRepository {
        repositories::audit::AuditRepository::new(self.conn.clone())
    }

    pub async fn add_audit_event(&self, event: &crate::domain::events::AuditEvent) -> Result<()> {
        self.audit_repo().add(event).await
    }

    pub async fn audit_for_account(
        &self,
        account_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AuditLog>, u64)> {
        self.audit_repo()
            .list_for_account(account_id, page, page_size)
            .await
    }

    pub async fn recent_audit(
        &self,
        action: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AuditLog>, u64)> {
        self.audit_repo().list_recent(action, page, page_size).await
    }
}
