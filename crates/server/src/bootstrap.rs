use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use warung_channel::delivery::DeliveryLoop;
use warung_channel::events::{EventDispatcher, InboundMessage, MessageHandler};
use warung_channel::session::SessionStore;
use warung_channel::transport::NoopChannelTransport;
use warung_channel::{
    ChannelRunner, ChannelTransport, Conversation, HttpBridgeTransport, NotificationQueue,
    ReconnectPolicy, StoreRepositories, Storefront,
};
use warung_core::audit::AuditSink;
use warung_core::config::{AppConfig, ConfigError, LoadOptions};
use warung_core::domain::admin::AdminDirectory;
use warung_db::{connect_with_config, migrations, DbPool};

use crate::audit::TracingAuditSink;
use crate::sync::SyncGateway;
use crate::{api, health, responses, webhooks};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub sessions: Arc<SessionStore>,
    pub queue: Arc<NotificationQueue>,
    pub gateway: Arc<SyncGateway>,
    pub transport: Arc<dyn ChannelTransport>,
    /// Feeds the bridge transport; `None` when running without a bridge.
    pub inbound: Option<mpsc::Sender<InboundMessage>>,
    pub channel_runner: ChannelRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        store = %config.store.name,
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let repos = StoreRepositories::sql(db_pool.clone());
    let idle_timeout = Duration::from_secs(config.session.idle_timeout_secs);
    let sessions = Arc::new(SessionStore::new(idle_timeout));

    let storefront = Arc::new(Storefront::new(
        repos.clone(),
        sessions.clone(),
        config.store.name.clone(),
        audit.clone(),
    ));
    let conversation = Conversation::new(
        storefront,
        sessions.clone(),
        AdminDirectory::from_config(&config.admin),
        config.store.clone(),
        audit.clone(),
    );
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(conversation));

    let (transport, inbound): (Arc<dyn ChannelTransport>, _) =
        match HttpBridgeTransport::from_config(&config.channel) {
            Some(bridge) => {
                let sender = bridge.inbound_sender();
                (Arc::new(bridge), Some(sender))
            }
            None => (Arc::new(NoopChannelTransport), None),
        };
    info!(
        event_name = "system.bootstrap.channel_transport",
        correlation_id = "bootstrap",
        transport_mode = if inbound.is_some() { "bridge" } else { "noop" },
        "channel transport selected"
    );

    let channel_runner = ChannelRunner::new(
        transport.clone(),
        dispatcher,
        ReconnectPolicy::from_config(&config.channel),
    );
    let queue = Arc::new(NotificationQueue::new(config.sync.queue_capacity));
    let gateway = Arc::new(SyncGateway::new(repos, queue.clone(), audit));

    Ok(Application {
        config,
        db_pool,
        sessions,
        queue,
        gateway,
        transport,
        inbound,
        channel_runner,
    })
}

impl Application {
    /// Every HTTP surface on one router: readiness, REST API, webhooks.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(health::router(self.db_pool.clone()))
            .merge(api::router(self.gateway.clone()))
            .merge(webhooks::router(
                self.gateway.clone(),
                self.config.sync.clone(),
                self.inbound.clone(),
            ))
            .fallback(responses::route_not_found)
    }

    pub fn delivery_loop(&self) -> DeliveryLoop {
        DeliveryLoop::new(
            self.queue.clone(),
            self.transport.clone(),
            Duration::from_secs(self.config.sync.notification_interval_secs),
        )
    }
}
