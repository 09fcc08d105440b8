use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use warung_cli::commands::{config, doctor, migrate, seed};

/// Each in-memory sqlite connection is its own database.
const SINGLE_CONNECTION_MEMORY_DB: [(&str, &str); 2] =
    [("WARUNG_DATABASE_URL", "sqlite::memory:"), ("WARUNG_DATABASE_MAX_CONNECTIONS", "1")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("WARUNG_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or("").contains("pending migration"));
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("WARUNG_DATABASE_URL", "postgres://localhost/warung")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_catalog_file_into_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let catalog = dir.path().join("products.json");
    fs::write(
        &catalog,
        r#"{"products":[
            {"id":"p-1","sku":"FAS001","name":"Kaos Polos","price":75000,"stock":10,"category":"fashion"},
            {"id":"p-2","sku":"ELE001","name":"Kabel Data","price":25000,"stock":0,"category":"elektronik","isAvailable":false}
        ]}"#,
    )
    .expect("write catalog");

    with_env(&SINGLE_CONNECTION_MEMORY_DB, || {
        let result = seed::run(&catalog);
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.starts_with("seeded 2 products (1 available) across 2 categories"));
    });
}

#[test]
fn seed_reports_missing_catalog_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.json");

    with_env(&[("WARUNG_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run(&missing);
        assert_eq!(result.exit_code, 6, "expected catalog file failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "catalog_file");
    });
}

#[test]
fn doctor_flags_pending_migrations_on_fresh_database() {
    with_env(&SINGLE_CONNECTION_MEMORY_DB, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1, "fresh database should fail the migrations check");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().expect("checks array");
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("channel_bridge"), "pass");
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("migrations"), "fail");
    });
}

#[test]
fn doctor_skips_downstream_checks_when_config_is_invalid() {
    with_env(&[("WARUNG_DATABASE_URL", "mysql://localhost/warung")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] database_connectivity"));
    });
}

#[test]
fn config_attributes_env_sources_and_redacts_secrets() {
    with_env(
        &[
            ("WARUNG_DATABASE_URL", "sqlite::memory:"),
            ("WARUNG_SYNC_WEBHOOK_SECRET", "super-secret-value"),
        ],
        || {
            let output = config::run();
            assert!(output
                .contains("- database.url = sqlite::memory: (source: env (WARUNG_DATABASE_URL))"));
            assert!(output.contains("- sync.webhook_secret = supe***"));
            assert!(!output.contains("super-secret-value"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "WARUNG_DATABASE_URL",
        "WARUNG_DATABASE_MAX_CONNECTIONS",
        "WARUNG_DATABASE_TIMEOUT_SECS",
        "WARUNG_CHANNEL_BRIDGE_URL",
        "WARUNG_CHANNEL_API_TOKEN",
        "WARUNG_SERVER_BIND_ADDRESS",
        "WARUNG_SERVER_PORT",
        "WARUNG_SYNC_WEBHOOK_SECRET",
        "WARUNG_SYNC_QUEUE_CAPACITY",
        "WARUNG_LOGGING_LEVEL",
        "WARUNG_LOGGING_FORMAT",
        "WARUNG_LOG_LEVEL",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
