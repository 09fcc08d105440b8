use tracing::info;

use warung_core::audit::{AuditEvent, AuditSink};

/// Writes audit events into the structured log stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let customer_id = event.customer_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown");
        let order_id = event.order_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown");

        info!(
            event_name = "audit.recorded",
            audit_event = %event.event_type,
            audit_id = %event.event_id,
            correlation_id = %event.correlation_id,
            customer_id,
            order_id,
            category = ?event.category,
            outcome = ?event.outcome,
            actor = %event.actor,
            metadata = ?event.metadata,
            "audit event recorded"
        );
    }
}
