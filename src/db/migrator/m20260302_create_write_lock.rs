use sea_orm_migration::prelude::*;

/// Single-row table touched at the start of every SQLite write transaction.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared(
            "CREATE TABLE IF NOT EXISTS write_lock (id INTEGER PRIMARY KEY NOT NULL, generation INTEGER NOT NULL DEFAULT 0)",
        )
        .await?;

        conn.execute_unprepared("INSERT OR IGNORE INTO write_lock (id, generation) VALUES (1, 0)")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS write_lock")
            .await?;
        Ok(())
    }
}
