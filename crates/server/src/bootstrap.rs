use std::sync::Arc;

use planpal_agent::Assistant;
use planpal_core::config::{AppConfig, ConfigError, LoadOptions};
use planpal_core::sources::SourceKind;
use planpal_db::{connect_with_settings, migrations, DbPool, Repositories};
use thiserror::Error;
use tracing::info;

use crate::planner::PlannerService;
use crate::sources::SourceAdapter;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub planner: PlannerService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
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

    let sources =
        SourceAdapter::from_config(&config.providers).map_err(BootstrapError::HttpClient)?;
    info!(
        event_name = "system.bootstrap.sources_ready",
        correlation_id = "bootstrap",
        places_live = sources.slot(SourceKind::Places).is_configured(),
        movies_live = sources.slot(SourceKind::Movies).is_configured(),
        cache_ttl_secs = config.providers.cache_ttl_secs,
        "suggestion sources initialized"
    );

    let planner = PlannerService::new(
        Repositories::sql(db_pool.clone()),
        Arc::new(sources),
        Assistant::new(config.assistant.mention.clone()),
        config.server.public_base_url.clone(),
    );

    Ok(Application { config, db_pool, planner })
}

#[cfg(test)]
mod tests {
    use planpal_core::config::{ConfigOverrides, LoadOptions};
    use planpal_core::sources::SourceKind;

    use crate::bootstrap::bootstrap;

    fn in_memory_options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                database_max_connections: Some(1),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_database_urls() {
        let result = bootstrap(in_memory_options("postgres://localhost/planpal")).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"), "{message}");
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_planner() {
        let app = bootstrap(in_memory_options("sqlite::memory:"))
            .await
            .expect("bootstrap should succeed with an in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('planning_group', 'poll', 'poll_vote')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected planning tables after bootstrap");
        assert_eq!(table_count, 3);

        let created = app.planner.create_group("Smoke", None, None).await.expect("create group");
        let generated = app
            .planner
            .generate_suggestions(created.group.code.as_str(), SourceKind::Movies)
            .await
            .expect("fallback suggestions");
        assert_eq!(generated.len(), 4);
        assert!(created.link.starts_with("http://localhost:5173/g/"));

        app.db_pool.close().await;
    }
}
