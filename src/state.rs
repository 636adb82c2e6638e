use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::{EphemeralCache, MemoryCache};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, AuditEmitter, AuthService, CredentialVerifier, FanOutEmitter,
    LockoutGovernor, SeaOrmAccountService, SeaOrmAuthService, SecretHasher, StoreAuditEmitter,
    TracingAuditEmitter,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    /// Backing store of the login throttle.
    pub cache: MemoryCache,

    pub governor: LockoutGovernor,

    pub accounts: Arc<dyn AccountService>,

    pub auth: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    /// Wires every service around an already opened store.
    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let audit: Arc<dyn AuditEmitter> = Arc::new(FanOutEmitter::new(vec![
            Arc::new(StoreAuditEmitter::new(store.clone())),
            Arc::new(TracingAuditEmitter),
        ]));
        Self::with_audit(config, store, audit)
    }

    pub fn with_audit(
        config: Config,
        store: Store,
        audit: Arc<dyn AuditEmitter>,
    ) -> anyhow::Result<Self> {
        let hasher = SecretHasher::from_config(&config.security)?;

        let cache = MemoryCache::new();
        let governor = LockoutGovernor::new(
            Arc::new(cache.clone()) as Arc<dyn EphemeralCache>,
            &config.security.auth_throttle,
        );

        let verifier = CredentialVerifier::new(
            store.clone(),
            hasher.clone(),
            config.security.deleted_login_policy,
        );

        let accounts: Arc<dyn AccountService> = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            hasher,
            Arc::clone(&audit),
        ));

        let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            verifier,
            governor.clone(),
            audit,
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            cache,
            governor,
            accounts,
            auth,
        })
    }
}
