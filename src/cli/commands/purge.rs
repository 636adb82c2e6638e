use crate::config::Config;
use crate::domain::ActorContext;
use crate::state::SharedState;

pub async fn cmd_purge(config: Config, days: Option<u32>, dry_run: bool) -> anyhow::Result<()> {
    let days = days.unwrap_or(config.lifecycle.purge_retention_days);
    let state = SharedState::new(config).await?;

    if dry_run {
        let count = state.accounts.count_purgeable(days).await?;
        println!("{count} account(s) soft-deleted more than {days} day(s) ago would be purged.");
        return Ok(());
    }

    let count = state
        .accounts
        .purge_older_than(&ActorContext::system(), days)
        .await?;
    println!("✓ Purged {count} account(s) soft-deleted more than {days} day(s) ago.");

    Ok(())
}
