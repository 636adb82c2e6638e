pub use super::accounts::Entity as Accounts;
pub use super::audit_logs::Entity as AuditLogs;
