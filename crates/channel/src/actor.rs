use warung_core::audit::AuditContext;
use warung_core::domain::admin::AdminAccess;
use warung_core::domain::customer::CustomerId;

/// Who sent the message being handled, resolved once per inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorContext {
    pub customer_id: CustomerId,
    pub chat_id: String,
    pub correlation_id: String,
    pub access: AdminAccess,
}

impl ActorContext {
    pub fn new(
        chat_id: impl Into<String>,
        correlation_id: impl Into<String>,
        access: AdminAccess,
    ) -> Self {
        let chat_id = chat_id.into();
        Self {
            customer_id: CustomerId::from_chat_id(&chat_id),
            chat_id,
            correlation_id: correlation_id.into(),
            access,
        }
    }

    pub fn audit_context(&self) -> AuditContext {
        AuditContext::new(
            Some(self.customer_id.clone()),
            None,
            self.correlation_id.clone(),
            self.customer_id.0.clone(),
        )
    }
}
