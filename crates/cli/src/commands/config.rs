use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use toml::Value;
use warung_core::config::{AppConfig, LoadOptions};

struct Field {
    key: &'static str,
    env_key: &'static str,
    value: String,
}

impl Field {
    fn new(key: &'static str, env_key: &'static str, value: impl ToString) -> Self {
        Self { key, env_key, value: value.to_string() }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field::new("database.url", "WARUNG_DATABASE_URL", &config.database.url),
        Field::new(
            "database.max_connections",
            "WARUNG_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections,
        ),
        Field::new(
            "database.timeout_secs",
            "WARUNG_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs,
        ),
        Field::new(
            "channel.bridge_url",
            "WARUNG_CHANNEL_BRIDGE_URL",
            config.channel.bridge_url.as_deref().unwrap_or("<unset>"),
        ),
        Field::new(
            "channel.api_token",
            "WARUNG_CHANNEL_API_TOKEN",
            redact(config.channel.api_token.as_ref()),
        ),
        Field::new(
            "server.bind_address",
            "WARUNG_SERVER_BIND_ADDRESS",
            &config.server.bind_address,
        ),
        Field::new("server.port", "WARUNG_SERVER_PORT", config.server.port),
        Field::new("store.name", "WARUNG_STORE_NAME", &config.store.name),
        Field::new(
            "store.panel_triggers",
            "WARUNG_STORE_PANEL_TRIGGERS",
            config.store.panel_triggers.join(","),
        ),
        Field::new(
            "admin.super_admins",
            "WARUNG_ADMIN_SUPER_ADMINS",
            format!("{} configured", config.admin.super_admins.len()),
        ),
        Field::new(
            "session.idle_timeout_secs",
            "WARUNG_SESSION_IDLE_TIMEOUT_SECS",
            config.session.idle_timeout_secs,
        ),
        Field::new(
            "sync.notification_interval_secs",
            "WARUNG_SYNC_NOTIFICATION_INTERVAL_SECS",
            config.sync.notification_interval_secs,
        ),
        Field::new("sync.queue_capacity", "WARUNG_SYNC_QUEUE_CAPACITY", config.sync.queue_capacity),
        Field::new(
            "sync.webhook_secret",
            "WARUNG_SYNC_WEBHOOK_SECRET",
            redact(config.sync.webhook_secret.as_ref()),
        ),
        Field::new("logging.level", "WARUNG_LOGGING_LEVEL", &config.logging.level),
        Field::new(
            "logging.format",
            "WARUNG_LOGGING_FORMAT",
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["warung.toml", "config/warung.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps at most a four-character prefix of a secret.
fn redact(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let exposed = secret.expose_secret().trim();
    if exposed.is_empty() {
        return "<empty>".to_string();
    }
    if exposed.len() <= 8 {
        return "<redacted>".to_string();
    }
    let prefix: String = exposed.chars().take(4).collect();
    format!("{prefix}***")
}
