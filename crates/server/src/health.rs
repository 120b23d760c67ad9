//! `GET /health`: database readiness and which suggestion sources answer live.
//!
//! A source without an API key reports `fallback`. It never degrades the
//! service; suggestions for that kind come from the static catalog.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use planpal_core::sources::SourceKind;
use planpal_db::DbPool;
use serde::Serialize;
use tracing::{debug, warn};

use crate::sources::{ProviderSlot, SourceAdapter};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    sources: Arc<SourceAdapter>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourcesHealth {
    pub places: HealthCheck,
    pub movies: HealthCheck,
}

impl SourcesHealth {
    fn fallback_kinds(&self) -> Vec<&'static str> {
        [(SourceKind::Places, &self.places), (SourceKind::Movies, &self.movies)]
            .into_iter()
            .filter(|(_, check)| check.status == "fallback")
            .map(|(kind, _)| kind.as_str())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub sources: SourcesHealth,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, sources: Arc<SourceAdapter>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, sources })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let sources = SourcesHealth {
        places: source_check(SourceKind::Places, state.sources.slot(SourceKind::Places)),
        movies: source_check(SourceKind::Movies, state.sources.slot(SourceKind::Movies)),
    };
    let ready = database.status == "ready";

    if !ready {
        warn!(
            event_name = "system.health.degraded",
            correlation_id = "health",
            detail = %database.detail,
            "health check found the database unavailable"
        );
    }
    let fallback = sources.fallback_kinds();
    if !fallback.is_empty() {
        debug!(
            event_name = "system.health.sources_fallback",
            correlation_id = "health",
            sources = ?fallback,
            "suggestion sources served from the static catalog"
        );
    }

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        sources,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn source_check(kind: SourceKind, slot: &ProviderSlot) -> HealthCheck {
    if slot.is_configured() {
        HealthCheck {
            status: "live",
            detail: format!("{} requests go to the provider", kind.as_str()),
        }
    } else {
        HealthCheck {
            status: "fallback",
            detail: format!("no {} API key; static fallback catalog in use", kind.as_str()),
        }
    }
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
