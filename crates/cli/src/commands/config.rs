use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use planpal_core::config::{resolve_config_path, AppConfig, LogFormat};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// One effective setting: dotted key, rendered value, env vars that can set it.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::success("config", lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let database = &config.database;
    let server = &config.server;
    let providers = &config.providers;

    vec![
        Field {
            key: "database.url",
            value: database.url.clone(),
            env_keys: &["PLANPAL_DATABASE_URL", "DATABASE_URL"],
        },
        Field {
            key: "database.max_connections",
            value: database.max_connections.to_string(),
            env_keys: &["PLANPAL_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key: "database.timeout_secs",
            value: database.timeout_secs.to_string(),
            env_keys: &["PLANPAL_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key: "server.bind_address",
            value: server.bind_address.clone(),
            env_keys: &["PLANPAL_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: server.port.to_string(),
            env_keys: &["PLANPAL_SERVER_PORT"],
        },
        Field {
            key: "server.graceful_shutdown_secs",
            value: server.graceful_shutdown_secs.to_string(),
            env_keys: &["PLANPAL_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Field {
            key: "server.public_base_url",
            value: server.public_base_url.clone(),
            env_keys: &["PLANPAL_SERVER_PUBLIC_BASE_URL", "BASE_URL"],
        },
        Field {
            key: "providers.places_api_key",
            value: redact_key(providers.places_api_key.as_ref()),
            env_keys: &["PLANPAL_PROVIDERS_PLACES_API_KEY", "GOOGLE_PLACES_KEY"],
        },
        Field {
            key: "providers.places_base_url",
            value: providers.places_base_url.clone(),
            env_keys: &["PLANPAL_PROVIDERS_PLACES_BASE_URL"],
        },
        Field {
            key: "providers.movies_api_key",
            value: redact_key(providers.movies_api_key.as_ref()),
            env_keys: &["PLANPAL_PROVIDERS_MOVIES_API_KEY", "TMDB_API_KEY"],
        },
        Field {
            key: "providers.movies_base_url",
            value: providers.movies_base_url.clone(),
            env_keys: &["PLANPAL_PROVIDERS_MOVIES_BASE_URL"],
        },
        Field {
            key: "providers.timeout_secs",
            value: providers.timeout_secs.to_string(),
            env_keys: &["PLANPAL_PROVIDERS_TIMEOUT_SECS"],
        },
        Field {
            key: "providers.cache_ttl_secs",
            value: providers.cache_ttl_secs.to_string(),
            env_keys: &["PLANPAL_PROVIDERS_CACHE_TTL_SECS"],
        },
        Field {
            key: "providers.search_radius_m",
            value: providers.search_radius_m.to_string(),
            env_keys: &["PLANPAL_PROVIDERS_SEARCH_RADIUS_M"],
        },
        Field {
            key: "providers.movie_language",
            value: providers.movie_language.clone(),
            env_keys: &["PLANPAL_PROVIDERS_MOVIE_LANGUAGE"],
        },
        Field {
            key: "assistant.mention",
            value: config.assistant.mention.clone(),
            env_keys: &["PLANPAL_ASSISTANT_MENTION"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["PLANPAL_LOGGING_LEVEL", "PLANPAL_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: log_format_label(config.logging.format).to_string(),
            env_keys: &["PLANPAL_LOGGING_FORMAT", "PLANPAL_LOG_FORMAT"],
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
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

fn log_format_label(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}

/// Never prints key material; only whether a key is present.
fn redact_key(key: Option<&SecretString>) -> String {
    match key.map(|key| key.expose_secret().trim().len()) {
        None => "<unset> (static fallback)".to_string(),
        Some(0) => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}
