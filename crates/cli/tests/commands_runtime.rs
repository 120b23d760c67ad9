use std::env;
use std::sync::{Mutex, OnceLock};

use planpal_cli::commands::{config, doctor, migrate, seed};
use serde_json::Value;
use tempfile::TempDir;

const IN_MEMORY: &[(&str, &str)] =
    &[("PLANPAL_DATABASE_URL", "sqlite::memory:"), ("PLANPAL_DATABASE_MAX_CONNECTIONS", "1")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(IN_MEMORY, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["error_class"], Value::Null);
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_override() {
    with_env(&[("PLANPAL_SERVER_PORT", "not-a-port")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_reports_unreachable_database() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}/missing/planpal.db", dir.path().display());

    let vars = [("PLANPAL_DATABASE_URL", url.as_str()), ("PLANPAL_DATABASE_TIMEOUT_SECS", "1")];

    with_env(&vars, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 4, "expected db connectivity failure: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "db_connectivity");
    });
}

#[test]
fn seed_loads_and_verifies_demo_group() {
    with_env(IN_MEMORY, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert_eq!(
            payload["message"],
            "demo dataset loaded: group FRIDAY with 5 members, 12 suggestions, 2 polls"
        );
    });
}

#[test]
fn seed_is_idempotent_against_the_same_database() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("planpal.db").display());

    with_env(&[("PLANPAL_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed success: {}", first.output);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed success: {}", second.output);

        let first_message = parse_payload(&first.output)["message"].clone();
        assert_eq!(first_message, parse_payload(&second.output)["message"]);
    });
}

#[test]
fn config_redacts_provider_keys_and_attributes_sources() {
    with_env(
        &[
            ("PLANPAL_DATABASE_URL", "sqlite::memory:"),
            ("GOOGLE_PLACES_KEY", "AIza-very-secret"),
            ("PLANPAL_PROVIDERS_CACHE_TTL_SECS", "600"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "expected config success: {}", result.output);

            let payload = parse_payload(&result.output);
            let message = payload["message"].as_str().unwrap_or_default();
            assert!(!message.contains("AIza-very-secret"), "{message}");
            assert!(message.contains(
                "- providers.places_api_key = <redacted> (source: env (GOOGLE_PLACES_KEY))"
            ));
            assert!(message.contains(
                "- providers.movies_api_key = <unset> (static fallback) (source: default)"
            ));
            assert!(message.contains(
                "- providers.cache_ttl_secs = 600 (source: env (PLANPAL_PROVIDERS_CACHE_TTL_SECS))"
            ));
            assert!(message.contains("- assistant.mention = @PlanPal (source: default)"));
        },
    );
}

#[test]
fn doctor_json_passes_in_fallback_mode() {
    with_env(IN_MEMORY, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "expected doctor success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "doctor");
        assert_eq!(payload["status"], "ok");

        let checks = payload["checks"].as_array().cloned().unwrap_or_default();
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("places_provider"), "skipped");
        assert_eq!(status_of("movies_provider"), "skipped");
        assert_eq!(status_of("database_connectivity"), "pass");
    });
}

#[test]
fn doctor_fails_when_config_is_invalid() {
    with_env(&[("PLANPAL_DATABASE_URL", "postgres://localhost/planpal")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert_eq!(payload["checks"][1]["status"], "skipped");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DATABASE_URL",
        "BASE_URL",
        "GOOGLE_PLACES_KEY",
        "TMDB_API_KEY",
        "PLANPAL_DATABASE_URL",
        "PLANPAL_DATABASE_MAX_CONNECTIONS",
        "PLANPAL_DATABASE_TIMEOUT_SECS",
        "PLANPAL_SERVER_BIND_ADDRESS",
        "PLANPAL_SERVER_PORT",
        "PLANPAL_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "PLANPAL_SERVER_PUBLIC_BASE_URL",
        "PLANPAL_PROVIDERS_PLACES_API_KEY",
        "PLANPAL_PROVIDERS_PLACES_BASE_URL",
        "PLANPAL_PROVIDERS_MOVIES_API_KEY",
        "PLANPAL_PROVIDERS_MOVIES_BASE_URL",
        "PLANPAL_PROVIDERS_TIMEOUT_SECS",
        "PLANPAL_PROVIDERS_CACHE_TTL_SECS",
        "PLANPAL_PROVIDERS_SEARCH_RADIUS_M",
        "PLANPAL_PROVIDERS_MOVIE_LANGUAGE",
        "PLANPAL_ASSISTANT_MENTION",
        "PLANPAL_LOGGING_LEVEL",
        "PLANPAL_LOGGING_FORMAT",
        "PLANPAL_LOG_LEVEL",
        "PLANPAL_LOG_FORMAT",
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
