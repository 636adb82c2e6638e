mod account;
mod purge;

pub use account::{CreateAccountArgs, cmd_create_account};
pub use purge::cmd_purge;
