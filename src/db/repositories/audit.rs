use crate::domain::events::AuditEvent;
use crate::entities::{audit_logs, prelude::*};
use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, event: &AuditEvent) -> Result<()> {
        let changes = if event.changes.is_null() {
            None
        } else {
            Some(event.changes.to_string())
        };

        let active_model = audit_logs::ActiveModel {
            action: Set(event.action.as_str().to_string()),
            actor_account_id: Set(event.actor.map(i32::from)),
            target_account_id: Set(event.target_account_id.map(i32::from)),
            login_identifier: Set(event.login_identifier.clone()),
            request_id: Set(event.request_id.clone()),
            changes: Set(changes),
            success: Set(event.success),
            occurred_at: Set(event.timestamp),
            ..Default::default()
        };

        AuditLogs::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to write audit log")?;
        Ok(())
    }

    /// Events for one account, newest first. `page` is 1-based.
    pub async fn list_for_account(
        &self,
        account_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<audit_logs::Model>, u64)> {
        let paginator = AuditLogs::find()
            .filter(audit_logs::Column::TargetAccountId.eq(account_id))
            .order_by_desc(audit_logs::Column::OccurredAt)
            .order_by_desc(audit_logs::Column::Id)
            .paginate(&self.conn, page_size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    pub async fn list_recent(
        &self,
        action: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<audit_logs::Model>, u64)> {
        let mut query = AuditLogs::find()
            .order_by_desc(audit_logs::Column::OccurredAt)
            .order_by_desc(audit_logs::Column::Id);

        if let Some(action) = action {
            query = query.filter(audit_logs::Column::Action.eq(action));
        }

        let paginator = query.paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }
}
