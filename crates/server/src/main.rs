mod api;
mod audit;
mod bootstrap;
mod health;
mod responses;
mod sync;
mod webhooks;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use warung_channel::session::SessionStore;
use warung_core::config::{AppConfig, LoadOptions};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use warung_core::config::LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap so its failures are visible.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let router = app.router();
    let delivery = app.delivery_loop();
    let (stop_tx, stop_rx) = watch::channel(false);

    let delivery_task = tokio::spawn(delivery.run(stopped(stop_rx.clone())));
    tokio::spawn(sweep_sessions(app.sessions.clone(), stopped(stop_rx)));

    let runner = app.channel_runner;
    tokio::spawn(async move {
        if let Err(error) = runner.start().await {
            tracing::error!(
                event_name = "system.channel.error",
                correlation_id = "runtime",
                error = %error,
                "channel runner terminated"
            );
        }
    });

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "warung-server listening"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        pending_notifications = app.queue.len(),
        "warung-server stopping"
    );
    let _ = stop_tx.send(true);
    if tokio::time::timeout(grace, delivery_task).await.is_err() {
        tracing::warn!(
            event_name = "system.server.drain_timeout",
            correlation_id = "shutdown",
            "notification drain did not finish within the grace period"
        );
    }
    app.db_pool.close().await;

    Ok(())
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn sweep_sessions<F>(sessions: Arc<SessionStore>, shutdown: F)
where
    F: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let purged = sessions.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(
                        event_name = "flow.session.purged",
                        purged,
                        "expired sessions purged"
                    );
                }
            }
            () = &mut shutdown => return,
        }
    }
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to listen for shutdown signal");
    }
}
