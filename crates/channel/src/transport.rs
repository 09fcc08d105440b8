use std::sync::atomic::{AtomicBool, Ordering};
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use warung_core::config::ChannelConfig;

use crate::events::{
    ChannelEnvelope, DispatchError, EventContext, EventDispatcher, HandlerResult, InboundMessage,
};

const INBOUND_BUFFER: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 500, max_delay_ms: 30_000 }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self {
            max_retries: config.reconnect_max_retries,
            base_delay_ms: config.reconnect_base_delay_ms,
            ..Self::default()
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<ChannelEnvelope>, TransportError>;
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopChannelTransport;

#[async_trait]
impl ChannelTransport for NoopChannelTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChannelEnvelope>, TransportError> {
        Ok(None)
    }

    async fn send_message(&self, chat_id: &str, _text: &str) -> Result<(), TransportError> {
        debug!(chat_id, "noop transport dropped outbound message");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// HTTP bridge to the chat gateway.
///
/// The bridge pushes inbound messages to our server, which forwards them through
/// [`HttpBridgeTransport::inbound_sender`]. Outbound messages are posted to
/// `{bridge_url}/send`.
pub struct HttpBridgeTransport {
    client: reqwest::Client,
    bridge_url: String,
    api_token: Option<SecretString>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    connected: AtomicBool,
}

impl HttpBridgeTransport {
    pub fn new(bridge_url: impl Into<String>, api_token: Option<SecretString>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        Self {
            client: reqwest::Client::new(),
            bridge_url: bridge_url.into().trim_end_matches('/').to_owned(),
            api_token,
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            connected: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &ChannelConfig) -> Option<Self> {
        let bridge_url = config.bridge_url.as_deref()?.trim();
        if bridge_url.is_empty() {
            return None;
        }
        Some(Self::new(bridge_url, config.api_token.clone()))
    }

    pub fn inbound_sender(&self) -> mpsc::Sender<InboundMessage> {
        self.inbound_tx.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelTransport for HttpBridgeTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut request = self.client.get(format!("{}/health", self.bridge_url));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| TransportError::Connect(error.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Connect(format!(
                "bridge health check returned {}",
                response.status()
            )));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChannelEnvelope>, TransportError> {
        let mut receiver = self.inbound_rx.lock().await;
        Ok(receiver.recv().await.map(ChannelEnvelope::message))
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        let mut request = self
            .client
            .post(format!("{}/send", self.bridge_url))
            .json(&json!({ "chatId": chat_id, "message": text }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| TransportError::Send(error.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Send(format!(
                "bridge rejected message with {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Pumps inbound envelopes through the dispatcher and sends replies back.
pub struct ChannelRunner {
    transport: Arc<dyn ChannelTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl ChannelRunner {
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "channel transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "channel retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening channel transport connection");
        self.transport.connect().await?;
        info!(attempt, "channel transport connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "channel transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            info!(
                event_name = "ingress.channel.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                "received channel envelope"
            );

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Reply { chat_id, text }) => {
                    if let Err(error) = self.transport.send_message(&chat_id, &text).await {
                        warn!(
                            event_name = "egress.channel.reply_failed",
                            envelope_id = %envelope.envelope_id,
                            correlation_id = %envelope.envelope_id,
                            error = %error,
                            "failed to send reply; continuing channel loop"
                        );
                    } else {
                        debug!(
                            event_name = "egress.channel.reply_sent",
                            envelope_id = %envelope.envelope_id,
                            correlation_id = %envelope.envelope_id,
                            "reply sent"
                        );
                    }
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %envelope.envelope_id,
                        error = %error,
                        "event dispatch failed; continuing channel loop"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{ChannelRunner, ChannelTransport, ReconnectPolicy, TransportError};
    use crate::events::{
        ChannelEnvelope, ChannelEvent, EventContext, EventDispatcher, EventHandlerError,
        InboundMessage, MessageHandler, MessageService,
    };

    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<ChannelEnvelope>, TransportError>>,
        send_results: VecDeque<Result<(), TransportError>>,
        connect_attempts: usize,
        sent: Vec<(String, String)>,
    }

    impl ScriptedTransport {
        pub(crate) fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<ChannelEnvelope>, TransportError>>,
            send_results: Vec<Result<(), TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    send_results: send_results.into(),
                    ..ScriptedState::default()
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        pub(crate) async fn sent(&self) -> Vec<(String, String)> {
            self.state.lock().await.sent.clone()
        }
    }

    #[async_trait]
    impl ChannelTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<ChannelEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            let result = state.send_results.pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                state.sent.push((chat_id.to_owned(), text.to_owned()));
            }
            result
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct ShoutService;

    #[async_trait]
    impl MessageService for ShoutService {
        async fn handle_message(
            &self,
            message: &InboundMessage,
            _ctx: &EventContext,
        ) -> Result<Option<String>, EventHandlerError> {
            Ok(Some(message.text.to_uppercase()))
        }
    }

    fn shouting_dispatcher() -> EventDispatcher {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(MessageHandler::new(ShoutService));
        dispatcher
    }

    fn no_delay(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure_and_replies() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("bridge down".to_owned())), Ok(())],
            vec![
                Ok(Some(ChannelEnvelope::message(InboundMessage::text(
                    "m-1",
                    "628111@c.us",
                    "halo",
                )))),
                Ok(None),
            ],
            vec![],
        ));

        let runner = ChannelRunner::new(transport.clone(), shouting_dispatcher(), no_delay(2));
        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.sent().await, vec![("628111@c.us".to_owned(), "HALO".to_owned())]);
    }

    #[tokio::test]
    async fn failed_reply_does_not_stop_the_loop() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![
                Ok(Some(ChannelEnvelope::message(InboundMessage::text("m-1", "628111@c.us", "a")))),
                Ok(Some(ChannelEnvelope {
                    envelope_id: "e-2".to_owned(),
                    event: ChannelEvent::Unsupported { event_type: "typing".to_owned() },
                })),
                Ok(Some(ChannelEnvelope::message(InboundMessage::text("m-3", "628222@c.us", "b")))),
                Ok(None),
            ],
            vec![Err(TransportError::Send("timeout".to_owned()))],
        ));

        let runner = ChannelRunner::new(transport.clone(), shouting_dispatcher(), no_delay(0));
        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.sent().await, vec![("628222@c.us".to_owned(), "B".to_owned())]);
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
            vec![],
        ));

        let runner = ChannelRunner::new(transport.clone(), EventDispatcher::default(), no_delay(2));
        runner.start().await.expect("runner should degrade gracefully");

        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy { max_retries: 5, base_delay_ms: 500, max_delay_ms: 3_000 };

        assert_eq!(policy.backoff(0).as_millis(), 500);
        assert_eq!(policy.backoff(1).as_millis(), 1_000);
        assert_eq!(policy.backoff(2).as_millis(), 2_000);
        assert_eq!(policy.backoff(3).as_millis(), 3_000);
        assert_eq!(policy.backoff(40).as_millis(), 3_000);
    }

    #[tokio::test]
    async fn bridge_transport_yields_forwarded_messages() {
        let transport = super::HttpBridgeTransport::new("http://127.0.0.1:9/", None);
        transport
            .inbound_sender()
            .send(InboundMessage::text("m-7", "628111@c.us", "KATALOG"))
            .await
            .expect("inbound channel should accept message");

        let envelope = transport
            .next_envelope()
            .await
            .expect("receive should succeed")
            .expect("envelope should be present");
        assert_eq!(envelope.envelope_id, "m-7");
        assert!(!transport.is_connected());
    }
}
