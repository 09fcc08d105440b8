pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use tokio::runtime::Runtime;
use warung_core::config::{AppConfig, LoadOptions};
use warung_db::{connect_with_config, migrations, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// A failed step with its error class and process exit code.
#[derive(Debug)]
pub(crate) struct StepFailure {
    pub class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl StepFailure {
    pub fn new(class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { class, message: message.into(), exit_code }
    }

    pub fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure(command, self.class, self.message, self.exit_code)
    }
}

pub(crate) fn load_config() -> Result<AppConfig, StepFailure> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        StepFailure::new("config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn runtime() -> Result<Runtime, StepFailure> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        StepFailure::new("runtime_init", format!("failed to initialize async runtime: {error}"), 3)
    })
}

/// Connects and applies pending migrations. Returns the pool and how many were applied.
pub(crate) async fn migrated_pool(config: &AppConfig) -> Result<(DbPool, usize), StepFailure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| StepFailure::new("db_connectivity", error.to_string(), 4))?;
    let pending = migrations::pending_count(&pool)
        .await
        .map_err(|error| StepFailure::new("migration", error.to_string(), 5))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| StepFailure::new("migration", error.to_string(), 5))?;
    Ok((pool, pending))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
