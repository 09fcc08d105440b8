use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use warung_core::domain::customer::is_group_chat;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelEnvelope {
    pub envelope_id: String,
    pub event: ChannelEvent,
}

impl ChannelEnvelope {
    pub fn message(message: InboundMessage) -> Self {
        Self { envelope_id: message.id.clone(), event: ChannelEvent::Message(message) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    Message(InboundMessage),
    Unsupported { event_type: String },
}

impl ChannelEvent {
    pub fn event_type(&self) -> ChannelEventType {
        match self {
            Self::Message(_) => ChannelEventType::Message,
            Self::Unsupported { .. } => ChannelEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelEventType {
    Message,
    Unsupported,
}

/// A chat message as delivered by the bridge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub id: String,
    /// Sender address, e.g. `6281234567890@c.us`.
    pub chat_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub from_me: bool,
    /// Media reference when the message carried an image.
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn text(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            text: text.into(),
            from_me: false,
            attachment: None,
            received_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Reply { chat_id: String, text: String },
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("message handler failure: {0}")]
    Message(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChannelEventType;
    async fn handle(
        &self,
        envelope: &ChannelEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChannelEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChannelEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Produces the reply for one direct message, or `None` to stay silent.
#[async_trait]
pub trait MessageService: Send + Sync {
    async fn handle_message(
        &self,
        message: &InboundMessage,
        ctx: &EventContext,
    ) -> Result<Option<String>, EventHandlerError>;
}

pub struct MessageHandler<S> {
    service: S,
}

impl<S> MessageHandler<S>
where
    S: MessageService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: MessageService + 'static,
{
    fn event_type(&self) -> ChannelEventType {
        ChannelEventType::Message
    }

    async fn handle(
        &self,
        envelope: &ChannelEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChannelEvent::Message(message) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        if message.from_me || is_group_chat(&message.chat_id) {
            debug!(
                correlation_id = %ctx.correlation_id,
                chat_id = %message.chat_id,
                from_me = message.from_me,
                "skipping message outside direct customer chats"
            );
            return Ok(HandlerResult::Ignored);
        }

        match self.service.handle_message(message, ctx).await? {
            Some(text) => Ok(HandlerResult::Reply { chat_id: message.chat_id.clone(), text }),
            None => Ok(HandlerResult::Processed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{
        ChannelEnvelope, ChannelEvent, EventContext, EventDispatcher, EventHandlerError,
        HandlerResult, InboundMessage, MessageHandler, MessageService,
    };

    #[derive(Clone, Default)]
    struct EchoService {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl MessageService for EchoService {
        async fn handle_message(
            &self,
            message: &InboundMessage,
            _ctx: &EventContext,
        ) -> Result<Option<String>, EventHandlerError> {
            self.seen.lock().await.push(message.text.clone());
            if message.text.is_empty() {
                return Ok(None);
            }
            Ok(Some(format!("echo: {}", message.text)))
        }
    }

    fn dispatcher_with(service: EchoService) -> EventDispatcher {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(MessageHandler::new(service));
        dispatcher
    }

    #[tokio::test]
    async fn direct_message_produces_reply_to_sender() {
        let service = EchoService::default();
        let dispatcher = dispatcher_with(service.clone());
        let envelope =
            ChannelEnvelope::message(InboundMessage::text("m-1", "628111@c.us", "katalog"));

        let result = dispatcher
            .dispatch(&envelope, &EventContext::default())
            .await
            .expect("dispatch should succeed");

        assert_eq!(
            result,
            HandlerResult::Reply {
                chat_id: "628111@c.us".to_owned(),
                text: "echo: katalog".to_owned()
            }
        );
        assert_eq!(dispatcher.handler_count(), 1);
    }

    #[tokio::test]
    async fn group_and_own_messages_are_ignored() {
        let service = EchoService::default();
        let dispatcher = dispatcher_with(service.clone());

        let group = ChannelEnvelope::message(InboundMessage::text("m-2", "1203@g.us", "halo"));
        let mut own = InboundMessage::text("m-3", "628111@c.us", "halo");
        own.from_me = true;

        for envelope in [group, ChannelEnvelope::message(own)] {
            let result = dispatcher
                .dispatch(&envelope, &EventContext::default())
                .await
                .expect("dispatch should succeed");
            assert_eq!(result, HandlerResult::Ignored);
        }
        assert!(service.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn silent_service_marks_message_processed() {
        let dispatcher = dispatcher_with(EchoService::default());
        let envelope = ChannelEnvelope::message(InboundMessage::text("m-4", "628111@c.us", ""));

        let result = dispatcher
            .dispatch(&envelope, &EventContext::default())
            .await
            .expect("dispatch should succeed");
        assert_eq!(result, HandlerResult::Processed);
    }

    #[tokio::test]
    async fn unsupported_events_are_ignored() {
        let dispatcher = dispatcher_with(EchoService::default());
        let envelope = ChannelEnvelope {
            envelope_id: "e-1".to_owned(),
            event: ChannelEvent::Unsupported { event_type: "presence".to_owned() },
        };

        let result = dispatcher
            .dispatch(&envelope, &EventContext::default())
            .await
            .expect("dispatch should succeed");
        assert_eq!(result, HandlerResult::Ignored);
    }

    #[test]
    fn inbound_message_reads_bridge_payload() {
        let message: InboundMessage = serde_json::from_str(
            r#"{"id":"m-9","chatId":"628111@c.us","text":"BELI FAS101 2","fromMe":false}"#,
        )
        .expect("payload should deserialize");

        assert_eq!(message.chat_id, "628111@c.us");
        assert_eq!(message.text, "BELI FAS101 2");
        assert!(message.attachment.is_none());
    }
}
