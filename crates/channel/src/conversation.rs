use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use warung_core::audit::AuditSink;
use warung_core::commands::{is_greeting, is_thank_you, parse_command};
use warung_core::config::StoreConfig;
use warung_core::domain::admin::AdminDirectory;
use warung_core::domain::customer::CustomerId;
use warung_core::flows::FlowInput;

use crate::actor::ActorContext;
use crate::commands::CommandRouter;
use crate::events::{EventContext, EventHandlerError, InboundMessage, MessageService};
use crate::locks::ActorLocks;
use crate::replies;
use crate::session::{SessionDriver, SessionStep, SessionStore};
use crate::storefront::Storefront;

/// Small talk below this many characters gets no fallback reply.
const FALLBACK_MIN_CHARS: usize = 6;

/// Decides how one inbound message is answered.
///
/// Order of precedence: an active flow, the admin panel trigger, keyword
/// commands, then greetings and thanks. Everything runs under the sender's lock.
pub struct Conversation {
    storefront: Arc<Storefront>,
    driver: SessionDriver<Storefront>,
    router: CommandRouter<Storefront>,
    admins: AdminDirectory,
    store: StoreConfig,
    locks: ActorLocks,
}

impl Conversation {
    pub fn new(
        storefront: Arc<Storefront>,
        sessions: Arc<SessionStore>,
        admins: AdminDirectory,
        store: StoreConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            driver: SessionDriver::new(sessions, storefront.clone(), audit),
            router: CommandRouter::new(storefront.clone()),
            storefront,
            admins,
            store,
            locks: ActorLocks::new(),
        }
    }

    pub async fn reply_to(&self, message: &InboundMessage, ctx: &EventContext) -> Option<String> {
        let customer_id = CustomerId::from_chat_id(&message.chat_id);
        let access = self.admins.access_for(&customer_id.0);
        let actor = ActorContext::new(&message.chat_id, &ctx.correlation_id, access);
        let _guard = self.locks.lock(&actor.customer_id.0).await;

        if let Err(error) = self.storefront.touch_customer(&actor).await {
            warn!(
                correlation_id = %actor.correlation_id,
                customer_id = %actor.customer_id,
                error = %error,
                "failed to record customer interaction"
            );
        }

        let text = message.text.trim();
        let mut input = FlowInput::text(text);
        input.attachment = message.attachment.clone();

        if let SessionStep::Handled(reply) = self.driver.advance(&actor, &input).await {
            return reply;
        }
        if text.is_empty() {
            return None;
        }

        if self.store.is_panel_trigger(text) {
            return Some(self.open_panel(&actor).await);
        }

        if let Some(parsed) = parse_command(text) {
            debug!(
                correlation_id = %actor.correlation_id,
                command = ?parsed.command,
                keyword = parsed.keyword,
                "routing keyword command"
            );
            return Some(self.router.respond(&parsed, text, &actor).await);
        }

        if is_greeting(text) {
            return Some(replies::greeting(&self.store.name));
        }
        if is_thank_you(text) {
            return Some(replies::thanks());
        }
        if text.chars().count() >= FALLBACK_MIN_CHARS {
            return Some(replies::not_understood());
        }
        None
    }

    async fn open_panel(&self, actor: &ActorContext) -> String {
        let outcome = match self.driver.engine().open_admin_panel(&actor.access) {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(customer_id = %actor.customer_id, "panel trigger from non-admin");
                return replies::access_denied();
            }
        };

        match self.driver.commit(actor, outcome).await {
            SessionStep::Handled(Some(reply)) => reply,
            SessionStep::Handled(None) | SessionStep::Idle => replies::admin_menu(&actor.access),
        }
    }
}

#[async_trait]
impl MessageService for Conversation {
    async fn handle_message(
        &self,
        message: &InboundMessage,
        ctx: &EventContext,
    ) -> Result<Option<String>, EventHandlerError> {
        Ok(self.reply_to(message, ctx).await)
    }
}
