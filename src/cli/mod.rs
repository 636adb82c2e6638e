//! CLI module - Command-line interface for Roster
//!
//! This module provides a structured CLI using clap for argument parsing.

pub mod commands;

use clap::{Parser, Subcommand};

/// Roster - Employee directory with account lifecycle management
#[derive(Parser)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the maintenance scheduler (default)
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create an account from the command line
    CreateAccount {
        /// Login identifier (employee number)
        identifier: String,

        #[arg(long)]
        display_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Grant administrator rights
        #[arg(long)]
        admin: bool,

        /// Create the account disabled
        #[arg(long)]
        disabled: bool,

        /// Password; a random one is generated and printed when omitted
        #[arg(long, env = "ROSTER_NEW_ACCOUNT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Permanently remove accounts soft-deleted longer than the retention window
    Purge {
        /// Retention in days (defaults to lifecycle.purge_retention_days)
        #[arg(long)]
        days: Option<u32>,

        /// Only report how many accounts would be removed
        #[arg(long)]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_purge_flags() {
        let cli = Cli::try_parse_from(["roster", "purge", "--days", "30", "--dry-run"]).unwrap();
        match cli.command {
            Some(Commands::Purge { days, dry_run }) => {
                assert_eq!(days, Some(30));
                assert!(dry_run);
            }
            _ => panic!("expected purge"),
        }
    }

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["roster"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_create_account() {
        let cli = Cli::try_parse_from([
            "roster",
            "create-account",
            "1000",
            "--admin",
            "--display-name",
            "Jane",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::CreateAccount {
                identifier,
                admin,
                display_name,
                disabled,
                ..
            }) => {
                assert_eq!(identifier, "1000");
                assert!(admin);
                assert!(!disabled);
                assert_eq!(display_name.as_deref(), Some("Jane"));
            }
            _ => panic!("expected create-account"),
        }
    }
}
