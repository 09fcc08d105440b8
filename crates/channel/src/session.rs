use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use warung_core::audit::AuditSink;
use warung_core::flows::{
    FlowAction, FlowContext, FlowEngine, FlowInput, FlowTransitionError, InputRejection, Session,
    SessionState, TransitionOutcome,
};

use crate::actor::ActorContext;
use crate::replies;

/// In-memory conversation state keyed by customer id.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    idle_timeout: chrono::Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: std::time::Duration) -> Self {
        let idle_timeout = chrono::Duration::from_std(idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::zero());
        Self { sessions: Mutex::new(HashMap::new()), idle_timeout }
    }

    /// The live session for `actor`. Expired sessions are discarded on read.
    pub async fn get(&self, actor: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let expired = sessions
            .get(actor)
            .is_some_and(|session| session.is_expired(self.idle_timeout, Utc::now()));
        if expired {
            sessions.remove(actor);
            info!(actor, "session expired");
            return None;
        }
        sessions.get(actor).cloned()
    }

    /// The live session for `actor`, starting an idle one when none is live.
    pub async fn get_or_create(&self, actor: &str) -> Session {
        if let Some(session) = self.get(actor).await {
            return session;
        }
        let session = Session::default();
        self.store(actor, session.clone()).await;
        session
    }

    pub async fn store(&self, actor: &str, session: Session) {
        self.sessions.lock().await.insert(actor.to_owned(), session);
    }

    pub async fn clear(&self, actor: &str) {
        self.sessions.lock().await.remove(actor);
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.idle_timeout, now));
        before - sessions.len()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("flow action failed: {0}")]
    Failed(String),
}

/// Carries out the side effects a flow transition asks for.
#[async_trait]
pub trait FlowActionExecutor: Send + Sync {
    async fn flow_context(
        &self,
        actor: &ActorContext,
        state: SessionState,
    ) -> Result<FlowContext, ActionError>;

    /// Returns the text to send for `action`, if any.
    async fn execute(
        &self,
        actor: &ActorContext,
        action: &FlowAction,
        outcome: &TransitionOutcome,
    ) -> Result<Option<String>, ActionError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStep {
    /// No flow is active; the message is free for command routing.
    Idle,
    Handled(Option<String>),
}

pub struct SessionDriver<E> {
    store: Arc<SessionStore>,
    engine: FlowEngine,
    executor: Arc<E>,
    audit: Arc<dyn AuditSink>,
}

impl<E> SessionDriver<E>
where
    E: FlowActionExecutor,
{
    pub fn new(store: Arc<SessionStore>, executor: Arc<E>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, engine: FlowEngine::new(), executor, audit }
    }

    pub fn engine(&self) -> &FlowEngine {
        &self.engine
    }

    /// Feeds one message into the actor's active flow.
    pub async fn advance(&self, actor: &ActorContext, input: &FlowInput) -> SessionStep {
        let key = actor.customer_id.0.as_str();
        let Some(mut session) = self.store.get(key).await else {
            return SessionStep::Idle;
        };
        if session.state.is_idle() {
            self.store.clear(key).await;
            return SessionStep::Idle;
        }

        let context = match self.executor.flow_context(actor, session.state).await {
            Ok(context) => context,
            Err(error) => return self.abort(actor, session.state, &error.to_string()).await,
        };

        let result = self.engine.apply_with_audit(
            session.state,
            &session.data,
            input,
            &context,
            self.audit.as_ref(),
            &actor.audit_context(),
        );

        match result {
            Ok(outcome) => self.commit(actor, outcome).await,
            Err(FlowTransitionError::InvalidInput {
                state,
                reason: InputRejection::MissingSessionData,
            }) => self.abort(actor, state, "session data missing").await,
            Err(FlowTransitionError::InvalidInput { state, reason }) => {
                session.updated_at = Utc::now();
                self.store.store(key, session).await;
                SessionStep::Handled(Some(replies::rejection(state, reason)))
            }
            Err(FlowTransitionError::PermissionDenied { .. }) => {
                session.updated_at = Utc::now();
                self.store.store(key, session).await;
                SessionStep::Handled(Some(replies::permission_denied()))
            }
            Err(FlowTransitionError::NotActive) => {
                self.store.clear(key).await;
                SessionStep::Idle
            }
            Err(error @ (FlowTransitionError::EmptyCart | FlowTransitionError::NotAdmin)) => {
                self.abort(actor, session.state, &error.to_string()).await
            }
        }
    }

    /// Persists the transition's target state, then runs its actions in order.
    pub async fn commit(&self, actor: &ActorContext, outcome: TransitionOutcome) -> SessionStep {
        let key = actor.customer_id.0.as_str();
        if outcome.is_terminal() {
            self.store.clear(key).await;
        } else {
            let mut session = self.store.get_or_create(key).await;
            session.apply(&outcome);
            self.store.store(key, session).await;
        }

        info!(
            event_name = "flow.transition",
            correlation_id = %actor.correlation_id,
            customer_id = %actor.customer_id,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            "session transition applied"
        );

        let mut texts = Vec::new();
        for action in &outcome.actions {
            match self.executor.execute(actor, action, &outcome).await {
                Ok(Some(text)) => texts.push(text),
                Ok(None) => {}
                Err(error) => return self.abort(actor, outcome.to, &error.to_string()).await,
            }
        }

        if texts.is_empty() {
            SessionStep::Handled(None)
        } else {
            SessionStep::Handled(Some(texts.join("\n\n")))
        }
    }

    async fn abort(&self, actor: &ActorContext, state: SessionState, reason: &str) -> SessionStep {
        warn!(
            correlation_id = %actor.correlation_id,
            customer_id = %actor.customer_id,
            state = state.as_str(),
            reason,
            "flow aborted; session cleared"
        );
        self.store.clear(actor.customer_id.0.as_str()).await;
        SessionStep::Handled(Some(replies::generic_failure()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use warung_core::audit::InMemoryAuditSink;
    use warung_core::domain::admin::AdminAccess;
    use warung_core::flows::{
        FlowAction, FlowContext, FlowInput, Session, SessionState, TransitionOutcome,
    };

    use super::{ActionError, FlowActionExecutor, SessionDriver, SessionStep, SessionStore};
    use crate::actor::ActorContext;

    #[derive(Default)]
    struct RecordingExecutor {
        executed: Mutex<Vec<FlowAction>>,
        fail_on_place_order: bool,
    }

    #[async_trait]
    impl FlowActionExecutor for RecordingExecutor {
        async fn flow_context(
            &self,
            actor: &ActorContext,
            _state: SessionState,
        ) -> Result<FlowContext, ActionError> {
            Ok(FlowContext { products: Vec::new(), access: actor.access.clone() })
        }

        async fn execute(
            &self,
            _actor: &ActorContext,
            action: &FlowAction,
            _outcome: &TransitionOutcome,
        ) -> Result<Option<String>, ActionError> {
            self.executed.lock().await.push(action.clone());
            match action {
                FlowAction::PlaceOrder { .. } if self.fail_on_place_order => {
                    Err(ActionError::Persistence("database offline".to_owned()))
                }
                FlowAction::SaveCustomerName(_) => Ok(None),
                other => Ok(Some(format!("{other:?}"))),
            }
        }
    }

    fn actor() -> ActorContext {
        ActorContext::new("628111@c.us", "msg-1", AdminAccess::user())
    }

    fn driver(
        executor: RecordingExecutor,
    ) -> (SessionDriver<RecordingExecutor>, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::new(Duration::from_secs(1_800)));
        let audit = Arc::new(InMemoryAuditSink::default());
        let driver = SessionDriver::new(store.clone(), Arc::new(executor), audit);
        (driver, store)
    }

    async fn begin_checkout(driver: &SessionDriver<RecordingExecutor>) {
        let outcome =
            driver.engine().start_checkout(false, None).expect("checkout should start");
        driver.commit(&actor(), outcome).await;
    }

    #[tokio::test]
    async fn idle_actor_passes_through() {
        let (driver, _) = driver(RecordingExecutor::default());
        assert_eq!(driver.advance(&actor(), &FlowInput::text("KATALOG")).await, SessionStep::Idle);
    }

    #[tokio::test]
    async fn get_or_create_starts_idle_and_keeps_live_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.get_or_create("628111").await.state.is_idle());
        assert_eq!(store.active_count().await, 1);

        store
            .store("628111", Session { state: SessionState::CheckoutName, ..Session::default() })
            .await;
        assert_eq!(store.get_or_create("628111").await.state, SessionState::CheckoutName);
    }

    #[tokio::test]
    async fn checkout_walks_name_address_confirm() {
        let (driver, store) = driver(RecordingExecutor::default());
        begin_checkout(&driver).await;

        let step = driver.advance(&actor(), &FlowInput::text("Budi")).await;
        assert_eq!(step, SessionStep::Handled(Some("PromptAddress".to_owned())));

        driver.advance(&actor(), &FlowInput::text("Jl. Merdeka 1, Bandung")).await;
        let session = store.get("628111").await.expect("session should be live");
        assert_eq!(session.state, SessionState::CheckoutConfirm);
        assert_eq!(session.data.name.as_deref(), Some("Budi"));

        let step = driver.advance(&actor(), &FlowInput::text("ya")).await;
        assert!(matches!(step, SessionStep::Handled(Some(text)) if text.starts_with("PlaceOrder")));
        assert!(store.get("628111").await.is_none());
    }

    #[tokio::test]
    async fn rejected_input_keeps_state_and_reprompts() {
        let (driver, store) = driver(RecordingExecutor::default());
        begin_checkout(&driver).await;

        let step = driver.advance(&actor(), &FlowInput::text("   ")).await;
        assert!(matches!(step, SessionStep::Handled(Some(text)) if text.contains("Nama tidak boleh kosong")));
        assert_eq!(
            store.get("628111").await.map(|session| session.state),
            Some(SessionState::CheckoutName)
        );
    }

    #[tokio::test]
    async fn failing_terminal_action_clears_session_with_generic_reply() {
        let executor = RecordingExecutor { fail_on_place_order: true, ..RecordingExecutor::default() };
        let (driver, store) = driver(executor);
        begin_checkout(&driver).await;
        driver.advance(&actor(), &FlowInput::text("Budi")).await;
        driver.advance(&actor(), &FlowInput::text("Jl. Merdeka 1")).await;

        let step = driver.advance(&actor(), &FlowInput::text("YA")).await;
        assert_eq!(step, SessionStep::Handled(Some(crate::replies::generic_failure())));
        assert!(store.get("628111").await.is_none());
    }

    #[tokio::test]
    async fn cancel_word_ends_checkout() {
        let (driver, store) = driver(RecordingExecutor::default());
        begin_checkout(&driver).await;

        let step = driver.advance(&actor(), &FlowInput::text("batal")).await;
        assert_eq!(step, SessionStep::Handled(Some("CheckoutAborted".to_owned())));
        assert_eq!(store.active_count().await, 0);
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let store = SessionStore::new(Duration::from_secs(60));
        let stale = Session {
            state: SessionState::CheckoutAddress,
            updated_at: chrono::Utc::now() - chrono::Duration::minutes(5),
            ..Session::default()
        };
        store.store("628111", stale.clone()).await;
        store.store("628222", stale).await;
        store.store("628333", Session { state: SessionState::CheckoutName, ..Session::default() }).await;

        assert!(store.get("628111").await.is_none());
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.active_count().await, 1);
    }
}
