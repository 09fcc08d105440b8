use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub channel: ChannelConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub admin: AdminConfig,
    pub session: SessionConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Messaging bridge base URL. Unset runs without a transport.
    pub bridge_url: Option<String>,
    pub api_token: Option<SecretString>,
    pub reconnect_max_retries: u32,
    pub reconnect_base_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub name: String,
    pub panel_triggers: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub super_admins: Vec<String>,
    #[serde(default)]
    pub product_admins: Vec<String>,
    #[serde(default)]
    pub order_admins: Vec<String>,
    /// Extra grants per phone, e.g. `"0812..." = ["products"]`.
    #[serde(default)]
    pub permissions: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Zero disables expiry.
    pub idle_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub notification_interval_secs: u64,
    pub queue_capacity: usize,
    pub webhook_secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub bridge_url: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://warung.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            channel: ChannelConfig {
                bridge_url: None,
                api_token: None,
                reconnect_max_retries: 10,
                reconnect_base_delay_ms: 1_000,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            store: StoreConfig {
                name: "Warung".to_string(),
                panel_triggers: vec!["PANEL".to_string(), "9090".to_string()],
            },
            admin: AdminConfig::default(),
            session: SessionConfig { idle_timeout_secs: 1_800 },
            sync: SyncConfig {
                notification_interval_secs: 5,
                queue_capacity: 1_000,
                webhook_secret: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl StoreConfig {
    pub fn is_panel_trigger(&self, text: &str) -> bool {
        let text = text.trim();
        self.panel_triggers.iter().any(|trigger| trigger.eq_ignore_ascii_case(text))
    }
}

impl SyncConfig {
    pub fn webhook_secret_matches(&self, presented: Option<&str>) -> bool {
        match &self.webhook_secret {
            None => true,
            Some(expected) => presented == Some(expected.expose_secret()),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("warung.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(channel) = patch.channel {
            if let Some(bridge_url) = channel.bridge_url {
                self.channel.bridge_url = Some(bridge_url);
            }
            if let Some(api_token) = channel.api_token {
                self.channel.api_token = Some(secret_value(api_token));
            }
            if let Some(max_retries) = channel.reconnect_max_retries {
                self.channel.reconnect_max_retries = max_retries;
            }
            if let Some(base_delay_ms) = channel.reconnect_base_delay_ms {
                self.channel.reconnect_base_delay_ms = base_delay_ms;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(store) = patch.store {
            if let Some(name) = store.name {
                self.store.name = name;
            }
            if let Some(panel_triggers) = store.panel_triggers {
                self.store.panel_triggers = panel_triggers;
            }
        }

        if let Some(admin) = patch.admin {
            self.admin = admin;
        }

        if let Some(session) = patch.session {
            if let Some(idle_timeout_secs) = session.idle_timeout_secs {
                self.session.idle_timeout_secs = idle_timeout_secs;
            }
        }

        if let Some(sync) = patch.sync {
            if let Some(interval) = sync.notification_interval_secs {
                self.sync.notification_interval_secs = interval;
            }
            if let Some(queue_capacity) = sync.queue_capacity {
                self.sync.queue_capacity = queue_capacity;
            }
            if let Some(webhook_secret) = sync.webhook_secret {
                self.sync.webhook_secret = Some(secret_value(webhook_secret));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("WARUNG_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("WARUNG_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("WARUNG_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("WARUNG_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("WARUNG_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WARUNG_CHANNEL_BRIDGE_URL") {
            self.channel.bridge_url = Some(value);
        }
        if let Some(value) = read_env("WARUNG_CHANNEL_API_TOKEN") {
            self.channel.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("WARUNG_CHANNEL_RECONNECT_MAX_RETRIES") {
            self.channel.reconnect_max_retries =
                parse_u32("WARUNG_CHANNEL_RECONNECT_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("WARUNG_CHANNEL_RECONNECT_BASE_DELAY_MS") {
            self.channel.reconnect_base_delay_ms =
                parse_u64("WARUNG_CHANNEL_RECONNECT_BASE_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("WARUNG_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("WARUNG_SERVER_PORT") {
            self.server.port = parse_u16("WARUNG_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("WARUNG_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("WARUNG_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("WARUNG_STORE_NAME") {
            self.store.name = value;
        }
        if let Some(value) = read_env("WARUNG_STORE_PANEL_TRIGGERS") {
            self.store.panel_triggers = split_list(&value);
        }

        if let Some(value) = read_env("WARUNG_ADMIN_SUPER_ADMINS") {
            self.admin.super_admins = split_list(&value);
        }
        if let Some(value) = read_env("WARUNG_ADMIN_PRODUCT_ADMINS") {
            self.admin.product_admins = split_list(&value);
        }
        if let Some(value) = read_env("WARUNG_ADMIN_ORDER_ADMINS") {
            self.admin.order_admins = split_list(&value);
        }

        if let Some(value) = read_env("WARUNG_SESSION_IDLE_TIMEOUT_SECS") {
            self.session.idle_timeout_secs =
                parse_u64("WARUNG_SESSION_IDLE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WARUNG_SYNC_NOTIFICATION_INTERVAL_SECS") {
            self.sync.notification_interval_secs =
                parse_u64("WARUNG_SYNC_NOTIFICATION_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("WARUNG_SYNC_QUEUE_CAPACITY") {
            self.sync.queue_capacity = parse_usize("WARUNG_SYNC_QUEUE_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("WARUNG_SYNC_WEBHOOK_SECRET") {
            self.sync.webhook_secret = Some(secret_value(value));
        }

        let log_level = read_env("WARUNG_LOGGING_LEVEL").or_else(|| read_env("WARUNG_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("WARUNG_LOGGING_FORMAT").or_else(|| read_env("WARUNG_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(bridge_url) = overrides.bridge_url {
            self.channel.bridge_url = Some(bridge_url);
        }
        if let Some(webhook_secret) = overrides.webhook_secret {
            self.sync.webhook_secret = Some(secret_value(webhook_secret));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_channel(&self.channel)?;
        validate_server(&self.server)?;
        validate_store(&self.store)?;
        validate_sync(&self.sync)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Effective settings with secrets masked, for operator output.
    pub fn redacted_summary(&self) -> serde_json::Value {
        let mask = |secret: &Option<SecretString>| {
            secret.as_ref().map(|_| "<redacted>").unwrap_or("<unset>").to_string()
        };

        serde_json::json!({
            "database": {
                "url": self.database.url,
                "max_connections": self.database.max_connections,
                "timeout_secs": self.database.timeout_secs,
            },
            "channel": {
                "bridge_url": self.channel.bridge_url,
                "api_token": mask(&self.channel.api_token),
                "reconnect_max_retries": self.channel.reconnect_max_retries,
                "reconnect_base_delay_ms": self.channel.reconnect_base_delay_ms,
            },
            "server": {
                "bind_address": self.server.bind_address,
                "port": self.server.port,
                "graceful_shutdown_secs": self.server.graceful_shutdown_secs,
            },
            "store": {
                "name": self.store.name,
                "panel_triggers": self.store.panel_triggers,
            },
            "admin": {
                "super_admins": self.admin.super_admins.len(),
                "product_admins": self.admin.product_admins.len(),
                "order_admins": self.admin.order_admins.len(),
            },
            "session": { "idle_timeout_secs": self.session.idle_timeout_secs },
            "sync": {
                "notification_interval_secs": self.sync.notification_interval_secs,
                "queue_capacity": self.sync.queue_capacity,
                "webhook_secret": mask(&self.sync.webhook_secret),
            },
            "logging": {
                "level": self.logging.level,
                "format": self.logging.format,
            },
        })
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("warung.toml"), PathBuf::from("config/warung.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_channel(channel: &ChannelConfig) -> Result<(), ConfigError> {
    if let Some(bridge_url) = &channel.bridge_url {
        if !bridge_url.starts_with("http://") && !bridge_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "channel.bridge_url must start with http:// or https://".to_string(),
            ));
        }
    }

    if channel.reconnect_base_delay_ms == 0 {
        return Err(ConfigError::Validation(
            "channel.reconnect_base_delay_ms must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.name.trim().is_empty() {
        return Err(ConfigError::Validation("store.name must not be empty".to_string()));
    }

    if store.panel_triggers.iter().all(|trigger| trigger.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "store.panel_triggers must contain at least one keyword".to_string(),
        ));
    }

    Ok(())
}

fn validate_sync(sync: &SyncConfig) -> Result<(), ConfigError> {
    if sync.notification_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sync.notification_interval_secs must be greater than zero".to_string(),
        ));
    }

    if sync.queue_capacity == 0 {
        return Err(ConfigError::Validation(
            "sync.queue_capacity must be greater than zero".to_string(),
        ));
    }

    if let Some(secret) = &sync.webhook_secret {
        if secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "sync.webhook_secret must not be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    channel: Option<ChannelPatch>,
    server: Option<ServerPatch>,
    store: Option<StorePatch>,
    admin: Option<AdminConfig>,
    session: Option<SessionPatch>,
    sync: Option<SyncPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelPatch {
    bridge_url: Option<String>,
    api_token: Option<String>,
    reconnect_max_retries: Option<u32>,
    reconnect_base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    name: Option<String>,
    panel_triggers: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SyncPatch {
    notification_interval_secs: Option<u64>,
    queue_capacity: Option<usize>,
    webhook_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_without_a_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.session.idle_timeout_secs == 1_800, "idle timeout defaults to 30 minutes")?;
        ensure(config.sync.notification_interval_secs == 5, "delivery interval defaults to 5s")?;
        ensure(config.sync.queue_capacity == 1_000, "queue capacity defaults to 1000")?;
        ensure(config.store.is_panel_trigger(" panel "), "PANEL is a default trigger")?;
        ensure(config.store.is_panel_trigger("9090"), "9090 is a default trigger")?;
        ensure(config.channel.bridge_url.is_none(), "no bridge by default")?;
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_WARUNG_BRIDGE_TOKEN", "bridge-token-from-env");
        env::set_var("TEST_WARUNG_HOOK_SECRET", "hook-secret-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("warung.toml");
            fs::write(
                &path,
                r#"
[channel]
bridge_url = "http://localhost:8090"
api_token = "${TEST_WARUNG_BRIDGE_TOKEN}"

[sync]
webhook_secret = "${TEST_WARUNG_HOOK_SECRET}"

[admin]
super_admins = ["081234567890"]

[admin.permissions]
"0899" = ["orders"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.channel.api_token.as_ref().map(|token| token.expose_secret())
                    == Some("bridge-token-from-env"),
                "bridge token should be loaded from environment",
            )?;
            ensure(
                config.sync.webhook_secret_matches(Some("hook-secret-from-env")),
                "webhook secret should be loaded from environment",
            )?;
            ensure(!config.sync.webhook_secret_matches(None), "missing secret must not match")?;
            ensure(config.admin.super_admins.len() == 1, "admin roster should be loaded")?;
            ensure(config.admin.permissions.contains_key("0899"), "permission map is loaded")?;
            Ok(())
        })();

        clear_vars(&["TEST_WARUNG_BRIDGE_TOKEN", "TEST_WARUNG_HOOK_SECRET"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WARUNG_LOG_LEVEL", "warn");
        env::set_var("WARUNG_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["WARUNG_LOG_LEVEL", "WARUNG_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WARUNG_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("WARUNG_STORE_NAME", "Toko Env");
        env::set_var("WARUNG_ADMIN_SUPER_ADMINS", "0811, 0822");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("warung.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[store]
name = "Toko File"

[server]
port = 4000

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.store.name == "Toko Env", "env store name should win over file")?;
            ensure(config.server.port == 4000, "file port should win over default")?;
            ensure(
                config.admin.super_admins == vec!["0811".to_string(), "0822".to_string()],
                "comma-separated env list should be split",
            )?;
            Ok(())
        })();

        clear_vars(&["WARUNG_DATABASE_URL", "WARUNG_STORE_NAME", "WARUNG_ADMIN_SUPER_ADMINS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WARUNG_SYNC_QUEUE_CAPACITY", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };

            match error {
                ConfigError::Validation(message) => ensure(
                    message.contains("sync.queue_capacity"),
                    "validation error should name the offending key",
                ),
                other => Err(format!("unexpected error: {other}")),
            }
        })();

        clear_vars(&["WARUNG_SYNC_QUEUE_CAPACITY"]);
        result
    }

    #[test]
    fn invalid_env_number_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WARUNG_SERVER_PORT", "not-a-port");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "WARUNG_SERVER_PORT", "error should name the env key")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid env override".to_string()),
        };

        clear_vars(&["WARUNG_SERVER_PORT"]);
        result
    }

    #[test]
    fn require_file_reports_missing_path() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("absent.toml");

        match AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Err(ConfigError::MissingConfigFile(path)) => {
                ensure(path == missing, "missing path should be reported")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected missing file error".to_string()),
        }
    }

    #[test]
    fn redacted_summary_hides_secrets() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                webhook_secret: Some("super-secret".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        let rendered = config.redacted_summary().to_string();
        ensure(!rendered.contains("super-secret"), "secret must not be rendered")?;
        ensure(rendered.contains("<redacted>"), "secret should be marked redacted")?;
        ensure(!format!("{:?}", config.sync).contains("super-secret"), "debug must not leak")?;
        Ok(())
    }
}
