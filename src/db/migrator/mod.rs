use sea_orm_migration::prelude::*;

mod m20260301_create_accounts;
mod m20260301_create_audit_logs;
mod m20260302_create_write_lock;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_create_accounts::Migration),
            Box::new(m20260301_create_audit_logs::Migration),
            Box::new(m20260302_create_write_lock::Migration),
        ]
    }
}
