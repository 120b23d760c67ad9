use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_CACHE_TTL_SECS;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// Frontend origin used to build `{public_base_url}/g/{code}` join links.
    pub public_base_url: String,
}

#[derive(Clone, Debug)]
pub struct ProvidersConfig {
    pub places_api_key: Option<SecretString>,
    pub places_base_url: String,
    pub movies_api_key: Option<SecretString>,
    pub movies_base_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub search_radius_m: u32,
    pub movie_language: String,
}

impl ProvidersConfig {
    pub fn places_configured(&self) -> bool {
        has_secret(self.places_api_key.as_ref())
    }

    pub fn movies_configured(&self) -> bool {
        has_secret(self.movies_api_key.as_ref())
    }
}

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub mention: String,
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
    pub database_max_connections: Option<u32>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub public_base_url: Option<String>,
    pub places_api_key: Option<String>,
    pub movies_api_key: Option<String>,
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
                url: "sqlite://planpal.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
                public_base_url: "http://localhost:5173".to_string(),
            },
            providers: ProvidersConfig {
                places_api_key: None,
                places_base_url: "https://maps.googleapis.com".to_string(),
                movies_api_key: None,
                movies_base_url: "https://api.themoviedb.org".to_string(),
                timeout_secs: 10,
                cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
                search_radius_m: 5000,
                movie_language: "en-IN".to_string(),
            },
            assistant: AssistantConfig { mention: "@PlanPal".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

fn has_secret(value: Option<&SecretString>) -> bool {
    value.map(|secret| !secret.expose_secret().trim().is_empty()).unwrap_or(false)
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("planpal.toml"));
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
            if let Some(public_base_url) = server.public_base_url {
                self.server.public_base_url = public_base_url;
            }
        }

        if let Some(providers) = patch.providers {
            if let Some(places_api_key) = providers.places_api_key {
                self.providers.places_api_key = Some(secret_value(places_api_key));
            }
            if let Some(places_base_url) = providers.places_base_url {
                self.providers.places_base_url = places_base_url;
            }
            if let Some(movies_api_key) = providers.movies_api_key {
                self.providers.movies_api_key = Some(secret_value(movies_api_key));
            }
            if let Some(movies_base_url) = providers.movies_base_url {
                self.providers.movies_base_url = movies_base_url;
            }
            if let Some(timeout_secs) = providers.timeout_secs {
                self.providers.timeout_secs = timeout_secs;
            }
            if let Some(cache_ttl_secs) = providers.cache_ttl_secs {
                self.providers.cache_ttl_secs = cache_ttl_secs;
            }
            if let Some(search_radius_m) = providers.search_radius_m {
                self.providers.search_radius_m = search_radius_m;
            }
            if let Some(movie_language) = providers.movie_language {
                self.providers.movie_language = movie_language;
            }
        }

        if let Some(assistant) = patch.assistant {
            if let Some(mention) = assistant.mention {
                self.assistant.mention = mention;
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
        if let Some(value) = read_env("PLANPAL_DATABASE_URL").or_else(|| read_env("DATABASE_URL"))
        {
            self.database.url = value;
        }
        if let Some(value) = read_env("PLANPAL_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("PLANPAL_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PLANPAL_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("PLANPAL_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PLANPAL_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PLANPAL_SERVER_PORT") {
            self.server.port = parse_u16("PLANPAL_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PLANPAL_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PLANPAL_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        let public_base_url =
            read_env("PLANPAL_SERVER_PUBLIC_BASE_URL").or_else(|| read_env("BASE_URL"));
        if let Some(value) = public_base_url {
            self.server.public_base_url = value;
        }

        let places_api_key =
            read_env("PLANPAL_PROVIDERS_PLACES_API_KEY").or_else(|| read_env("GOOGLE_PLACES_KEY"));
        if let Some(value) = places_api_key {
            self.providers.places_api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PLANPAL_PROVIDERS_PLACES_BASE_URL") {
            self.providers.places_base_url = value;
        }
        let movies_api_key =
            read_env("PLANPAL_PROVIDERS_MOVIES_API_KEY").or_else(|| read_env("TMDB_API_KEY"));
        if let Some(value) = movies_api_key {
            self.providers.movies_api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PLANPAL_PROVIDERS_MOVIES_BASE_URL") {
            self.providers.movies_base_url = value;
        }
        if let Some(value) = read_env("PLANPAL_PROVIDERS_TIMEOUT_SECS") {
            self.providers.timeout_secs = parse_u64("PLANPAL_PROVIDERS_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PLANPAL_PROVIDERS_CACHE_TTL_SECS") {
            self.providers.cache_ttl_secs =
                parse_u64("PLANPAL_PROVIDERS_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("PLANPAL_PROVIDERS_SEARCH_RADIUS_M") {
            self.providers.search_radius_m =
                parse_u32("PLANPAL_PROVIDERS_SEARCH_RADIUS_M", &value)?;
        }
        if let Some(value) = read_env("PLANPAL_PROVIDERS_MOVIE_LANGUAGE") {
            self.providers.movie_language = value;
        }

        if let Some(value) = read_env("PLANPAL_ASSISTANT_MENTION") {
            self.assistant.mention = value;
        }

        let log_level =
            read_env("PLANPAL_LOGGING_LEVEL").or_else(|| read_env("PLANPAL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PLANPAL_LOGGING_FORMAT").or_else(|| read_env("PLANPAL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(max_connections) = overrides.database_max_connections {
            self.database.max_connections = max_connections;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(public_base_url) = overrides.public_base_url {
            self.server.public_base_url = public_base_url;
        }
        if let Some(places_api_key) = overrides.places_api_key {
            self.providers.places_api_key = Some(secret_value(places_api_key));
        }
        if let Some(movies_api_key) = overrides.movies_api_key {
            self.providers.movies_api_key = Some(secret_value(movies_api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_providers(&self.providers)?;
        validate_assistant(&self.assistant)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("planpal.toml"), PathBuf::from("config/planpal.toml")]
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

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if !is_http_url(&server.public_base_url) {
        return Err(ConfigError::Validation(
            "server.public_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_providers(providers: &ProvidersConfig) -> Result<(), ConfigError> {
    if providers.timeout_secs == 0 || providers.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "providers.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if providers.cache_ttl_secs == 0 || providers.cache_ttl_secs > 86_400 {
        return Err(ConfigError::Validation(
            "providers.cache_ttl_secs must be in range 1..=86400".to_string(),
        ));
    }

    if providers.search_radius_m == 0 || providers.search_radius_m > 50_000 {
        return Err(ConfigError::Validation(
            "providers.search_radius_m must be in range 1..=50000".to_string(),
        ));
    }

    for (key, url) in [
        ("providers.places_base_url", &providers.places_base_url),
        ("providers.movies_base_url", &providers.movies_base_url),
    ] {
        if !is_http_url(url) {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    Ok(())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if assistant.mention.trim().is_empty() {
        return Err(ConfigError::Validation("assistant.mention must not be empty".to_string()));
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

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    providers: Option<ProvidersPatch>,
    assistant: Option<AssistantPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    public_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvidersPatch {
    places_api_key: Option<String>,
    places_base_url: Option<String>,
    movies_api_key: Option<String>,
    movies_base_url: Option<String>,
    timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    search_radius_m: Option<u32>,
    movie_language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantPatch {
    mention: Option<String>,
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

    const MANAGED_VARS: &[&str] = &[
        "DATABASE_URL",
        "BASE_URL",
        "GOOGLE_PLACES_KEY",
        "TMDB_API_KEY",
        "PLANPAL_DATABASE_URL",
        "PLANPAL_SERVER_PORT",
        "PLANPAL_PROVIDERS_PLACES_API_KEY",
        "PLANPAL_PROVIDERS_MOVIES_API_KEY",
        "PLANPAL_PROVIDERS_CACHE_TTL_SECS",
        "PLANPAL_LOG_LEVEL",
        "PLANPAL_LOG_FORMAT",
        "PLANPAL_LOGGING_LEVEL",
        "PLANPAL_LOGGING_FORMAT",
        "TEST_PLANPAL_PLACES_KEY",
    ];

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
    fn defaults_are_valid_without_provider_keys() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.providers.places_configured(), "places should run in fallback mode")?;
        ensure(!config.providers.movies_configured(), "movies should run in fallback mode")?;
        ensure(config.providers.timeout_secs == 10, "provider timeout should default to 10s")?;
        ensure(config.providers.cache_ttl_secs == 1800, "cache ttl should default to 1800s")?;
        ensure(config.assistant.mention == "@PlanPal", "default mention should be @PlanPal")?;
        ensure(
            config.server.public_base_url == "http://localhost:5173",
            "join links should default to the local frontend",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("TEST_PLANPAL_PLACES_KEY", "places-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("planpal.toml");
            fs::write(
                &path,
                r#"
[providers]
places_api_key = "${TEST_PLANPAL_PLACES_KEY}"
search_radius_m = 3000

[assistant]
mention = "@Buddy"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config
                    .providers
                    .places_api_key
                    .as_ref()
                    .map(|key| key.expose_secret() == "places-from-env")
                    .unwrap_or(false),
                "places key should be interpolated from environment",
            )?;
            ensure(config.providers.search_radius_m == 3000, "radius should come from file")?;
            ensure(config.assistant.mention == "@Buddy", "mention should come from file")?;
            Ok(())
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn legacy_env_names_are_accepted() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("GOOGLE_PLACES_KEY", "legacy-places");
        env::set_var("TMDB_API_KEY", "legacy-movies");
        env::set_var("BASE_URL", "https://planpal.example");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.providers.places_configured(), "GOOGLE_PLACES_KEY should be used")?;
            ensure(config.providers.movies_configured(), "TMDB_API_KEY should be used")?;
            ensure(
                config.server.public_base_url == "https://planpal.example",
                "BASE_URL should set the join link origin",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("PLANPAL_LOG_LEVEL", "warn");
        env::set_var("PLANPAL_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("PLANPAL_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("PLANPAL_SERVER_PORT", "9100");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("planpal.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[server]
port = 9000
public_base_url = "https://from-file.example"

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
            ensure(config.server.port == 9100, "env port should win over file")?;
            ensure(
                config.server.public_base_url == "https://from-file.example",
                "file value should win over default",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn invalid_numeric_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("PLANPAL_PROVIDERS_CACHE_TTL_SECS", "half-an-hour");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override failure".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "PLANPAL_PROVIDERS_CACHE_TTL_SECS",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                public_base_url: Some("localhost:5173".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".into()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("server.public_base_url")
        );
        ensure(has_message, "validation failure should mention server.public_base_url")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("PLANPAL_PROVIDERS_PLACES_API_KEY", "places-secret-value");
        env::set_var("PLANPAL_PROVIDERS_MOVIES_API_KEY", "movies-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("places-secret-value"), "debug should not contain places key")?;
            ensure(!debug.contains("movies-secret-value"), "debug should not contain movies key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }
}
