use crate::config::Config;
use crate::domain::ActorContext;
use crate::models::account::NewAccount;
use crate::services::password::generate_secret;
use crate::state::SharedState;

pub struct CreateAccountArgs {
    pub identifier: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub admin: bool,
    pub disabled: bool,
    pub password: Option<String>,
}

pub async fn cmd_create_account(config: Config, args: CreateAccountArgs) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    let (secret, generated) = match args.password.filter(|p| !p.is_empty()) {
        Some(password) => (password, false),
        None => (generate_secret(), true),
    };

    let result = state
        .accounts
        .create(
            &ActorContext::system(),
            NewAccount {
                login_identifier: args.identifier,
                display_name: args.display_name,
                email: args.email,
                secret: secret.clone(),
                is_admin: args.admin,
                is_enabled: !args.disabled,
            },
        )
        .await;

    match result {
        Ok(account) => {
            println!(
                "✓ Created account {} ({}){}",
                account.login_identifier,
                account.id,
                if account.is_admin { " [admin]" } else { "" }
            );
            if generated {
                println!("  Password: {secret}");
            }
            Ok(())
        }
        Err(e) => {
            println!("Failed to create account: {e}");
            Err(e.into())
        }
    }
}
