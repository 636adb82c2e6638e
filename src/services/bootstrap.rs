use tracing::{info, warn};

use crate::config::BootstrapConfig;
use crate::domain::ActorContext;
use crate::models::account::{Account, NewAccount};
use crate::services::password::generate_secret;
use crate::services::{AccountError, AccountService};

/// Creates the first administrator when the store holds no accounts at all,
/// soft-deleted ones included.
pub async fn ensure_admin(
    accounts: &dyn AccountService,
    config: &BootstrapConfig,
) -> Result<Option<Account>, AccountError> {
    if !config.enabled {
        return Ok(None);
    }

    let stats = accounts.stats().await?;
    if stats.total + stats.soft_deleted > 0 {
        return Ok(None);
    }

    let (secret, generated) = match config.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => (password.to_string(), false),
        None => (generate_secret(), true),
    };

    let account = accounts
        .create(
            &ActorContext::system(),
            NewAccount {
                login_identifier: config.identifier.clone(),
                display_name: Some(config.display_name.clone()),
                email: None,
                secret: secret.clone(),
                is_admin: true,
                is_enabled: true,
            },
        )
        .await?;

    info!(
        event = "bootstrap_admin_created",
        account_id = account.id.value(),
        identifier = %account.login_identifier,
        "Created initial administrator"
    );
    if generated {
        warn!(
            identifier = %account.login_identifier,
            password = %secret,
            "Generated administrator password. Change it after first login."
        );
    }

    Ok(Some(account))
}
