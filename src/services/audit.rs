//! Destinations for audit events.
//!
//! Emitting never fails the operation that produced the event; sink errors
//! are logged and dropped.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::Store;
use crate::domain::events::AuditEvent;

#[async_trait]
pub trait AuditEmitter: Send + Sync {
    async fn emit(&self, event: AuditEvent);
}

/// Persists events to the `audit_logs` table.
pub struct StoreAuditEmitter {
    store: Store,
}

impl StoreAuditEmitter {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditEmitter for StoreAuditEmitter {
    async fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.store.add_audit_event(&event).await {
            error!(
                error = ?e,
                action = event.action.as_str(),
                "Failed to persist audit event"
            );
        }
    }
}

/// Writes each event as a structured log line under the `audit` target.
pub struct TracingAuditEmitter;

#[async_trait]
impl AuditEmitter for TracingAuditEmitter {
    async fn emit(&self, event: AuditEvent) {
        info!(
            target: "audit",
            action = event.action.as_str(),
            actor = ?event.actor.map(i32::from),
            target_account_id = ?event.target_account_id.map(i32::from),
            login_identifier = event.login_identifier.as_deref(),
            request_id = event.request_id.as_deref(),
            success = event.success,
            changes = %event.changes,
            "audit"
        );
    }
}

/// Forwards every event to each inner sink in order.
pub struct FanOutEmitter {
    sinks: Vec<Arc<dyn AuditEmitter>>,
}

impl FanOutEmitter {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn AuditEmitter>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl AuditEmitter for FanOutEmitter {
    async fn emit(&self, event: AuditEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActorContext;
    use crate::domain::events::AuditAction;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<AuditAction>>,
    }

    #[async_trait]
    impl AuditEmitter for Recorder {
        async fn emit(&self, event: AuditEvent) {
            self.seen.lock().await.push(event.action);
        }
    }

    #[tokio::test]
    async fn fan_out_reaches_every_sink() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let fan_out = FanOutEmitter::new(vec![
            first.clone(),
            Arc::new(TracingAuditEmitter),
            second.clone(),
        ]);

        fan_out
            .emit(AuditEvent::new(AuditAction::Create, &ActorContext::system()))
            .await;

        assert_eq!(*first.seen.lock().await, vec![AuditAction::Create]);
        assert_eq!(*second.seen.lock().await, vec![AuditAction::Create]);
    }
}
