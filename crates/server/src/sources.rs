//! Outbound calls to the places and movies providers.
//!
//! [`SourceAdapter::fetch_candidates`] never fails. A provider without an API
//! key, a provider error and a malformed payload all resolve to the static
//! fallback set for that kind. Only live results are cached.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use planpal_core::cache::{CandidateCache, InMemoryCandidateCache};
use planpal_core::config::ProvidersConfig;
use planpal_core::sources::{
    fallback_candidates, movie_genre_for, place_type_for, CandidateQuery, MoviesPayload,
    PlacesPayload, RawCandidate, SourceKind, MAX_CANDIDATES,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    Transport(String),
    Status(u16),
    Payload(String),
}

impl FetchFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Payload(_) => "payload",
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "provider did not answer in time"),
            Self::Transport(detail) => write!(f, "transport error: {detail}"),
            Self::Status(code) => write!(f, "provider returned HTTP {code}"),
            Self::Payload(detail) => write!(f, "unusable payload: {detail}"),
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(error: reqwest::Error) -> Self {
        // Request URLs carry the API key.
        let error = error.without_url();
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::Payload(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

#[async_trait]
pub trait CandidateProvider: Send + Sync {
    async fn fetch(&self, query: &CandidateQuery) -> Result<Vec<RawCandidate>, FetchFailure>;
}

/// Google Places nearby search.
pub struct PlacesProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    radius_m: u32,
}

impl PlacesProvider {
    pub fn new(client: Client, base_url: &str, api_key: SecretString, radius_m: u32) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key, radius_m }
    }
}

#[async_trait]
impl CandidateProvider for PlacesProvider {
    async fn fetch(&self, query: &CandidateQuery) -> Result<Vec<RawCandidate>, FetchFailure> {
        let url = format!("{}/maps/api/place/nearbysearch/json", self.base_url);
        let location = format!("{},{}", query.location.lat, query.location.lng);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("radius", self.radius_m.to_string().as_str()),
                ("type", place_type_for(&query.mood)),
                ("key", self.api_key.expose_secret()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchFailure::Status(response.status().as_u16()));
        }

        let payload: PlacesPayload = response.json().await?;
        if payload.status != "OK" {
            return Err(FetchFailure::Payload(format!("places status `{}`", payload.status)));
        }
        Ok(payload.results.into_iter().map(RawCandidate::Place).collect())
    }
}

/// TMDb discover, most popular first.
pub struct MoviesProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    language: String,
}

impl MoviesProvider {
    pub fn new(client: Client, base_url: &str, api_key: SecretString, language: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl CandidateProvider for MoviesProvider {
    async fn fetch(&self, query: &CandidateQuery) -> Result<Vec<RawCandidate>, FetchFailure> {
        let url = format!("{}/3/discover/movie", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.expose_secret()),
                ("with_genres", movie_genre_for(&query.mood).to_string().as_str()),
                ("sort_by", "popularity.desc"),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchFailure::Status(response.status().as_u16()));
        }

        let payload: MoviesPayload = response.json().await?;
        let results = payload
            .results
            .ok_or_else(|| FetchFailure::Payload("movies payload has no results".to_string()))?;
        Ok(results.into_iter().map(RawCandidate::Movie).collect())
    }
}

pub enum ProviderSlot {
    Configured(Arc<dyn CandidateProvider>),
    MissingCredential,
}

impl ProviderSlot {
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

pub struct SourceAdapter {
    places: ProviderSlot,
    movies: ProviderSlot,
    cache: Arc<dyn CandidateCache>,
}

impl SourceAdapter {
    pub fn new(places: ProviderSlot, movies: ProviderSlot, cache: Arc<dyn CandidateCache>) -> Self {
        Self { places, movies, cache }
    }

    /// Builds both providers over one HTTP client bounded by `timeout_secs`.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        let places = match &config.places_api_key {
            Some(key) if config.places_configured() => {
                ProviderSlot::Configured(Arc::new(PlacesProvider::new(
                    client.clone(),
                    &config.places_base_url,
                    key.clone(),
                    config.search_radius_m,
                )))
            }
            _ => ProviderSlot::MissingCredential,
        };
        let movies = match &config.movies_api_key {
            Some(key) if config.movies_configured() => {
                ProviderSlot::Configured(Arc::new(MoviesProvider::new(
                    client,
                    &config.movies_base_url,
                    key.clone(),
                    &config.movie_language,
                )))
            }
            _ => ProviderSlot::MissingCredential,
        };

        let cache = Arc::new(InMemoryCandidateCache::new(config.cache_ttl_secs));
        Ok(Self::new(places, movies, cache))
    }

    pub fn slot(&self, kind: SourceKind) -> &ProviderSlot {
        match kind {
            SourceKind::Places => &self.places,
            SourceKind::Movies => &self.movies,
        }
    }

    /// At most [`MAX_CANDIDATES`] candidates for `query`.
    pub async fn fetch_candidates(&self, query: &CandidateQuery) -> Vec<RawCandidate> {
        let source = query.kind.as_str();
        let provider = match self.slot(query.kind) {
            ProviderSlot::Configured(provider) => provider,
            ProviderSlot::MissingCredential => {
                debug!(
                    event_name = "sources.fallback.missing_credential",
                    source,
                    "provider has no API key, serving fallback candidates"
                );
                return fallback_candidates(query.kind);
            }
        };

        let key = query.cache_key();
        if let Some(cached) = self.cache.get(&key).await {
            debug!(event_name = "sources.cache.hit", source, "serving cached candidates");
            return cached;
        }

        match provider.fetch(query).await {
            Ok(mut candidates) => {
                candidates.truncate(MAX_CANDIDATES);
                self.cache.set(key, candidates.clone()).await;
                debug!(
                    event_name = "sources.fetch.completed",
                    source,
                    candidates = candidates.len(),
                    "provider candidates fetched"
                );
                candidates
            }
            Err(failure) => {
                warn!(
                    event_name = "sources.fallback.fetch_failed",
                    source,
                    reason = failure.reason(),
                    error = %failure,
                    "provider fetch failed, serving fallback candidates"
                );
                fallback_candidates(query.kind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use planpal_core::cache::{CandidateCache, InMemoryCandidateCache};
    use planpal_core::config::ProvidersConfig;
    use planpal_core::domain::group::{BudgetLevel, Mood};
    use planpal_core::geo::Coordinates;
    use planpal_core::sources::{
        fallback_candidates, CandidateQuery, RawCandidate, RawPlace, SourceKind,
    };
    use reqwest::Client;
    use serde_json::json;

    use super::{
        CandidateProvider, FetchFailure, MoviesProvider, PlacesProvider, ProviderSlot,
        SourceAdapter,
    };

    struct StubProvider {
        calls: AtomicUsize,
        outcome: Result<usize, FetchFailure>,
    }

    impl StubProvider {
        fn returning(count: usize) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), outcome: Ok(count) })
        }

        fn failing(failure: FetchFailure) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), outcome: Err(failure) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CandidateProvider for StubProvider {
        async fn fetch(&self, _: &CandidateQuery) -> Result<Vec<RawCandidate>, FetchFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let count = self.outcome.clone()?;
            Ok((0..count)
                .map(|index| {
                    RawCandidate::Place(RawPlace {
                        place_id: Some(format!("live-{index}")),
                        name: Some(format!("Live Place {index}")),
                        ..RawPlace::default()
                    })
                })
                .collect())
        }
    }

    fn query(kind: SourceKind) -> CandidateQuery {
        CandidateQuery {
            kind,
            mood: Mood::Chill,
            budget: BudgetLevel::Medium,
            location: Coordinates::new(12.9716, 77.5946),
        }
    }

    fn adapter(provider: Arc<StubProvider>, cache: Arc<InMemoryCandidateCache>) -> SourceAdapter {
        SourceAdapter::new(
            ProviderSlot::Configured(provider),
            ProviderSlot::MissingCredential,
            cache,
        )
    }

    #[tokio::test]
    async fn missing_credential_serves_fallback_without_caching() {
        let cache = Arc::new(InMemoryCandidateCache::new(1800));
        let adapter = adapter(StubProvider::returning(3), cache.clone());

        let movies = adapter.fetch_candidates(&query(SourceKind::Movies)).await;

        assert_eq!(movies, fallback_candidates(SourceKind::Movies));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn live_results_are_truncated_and_cached() {
        let provider = StubProvider::returning(14);
        let cache = Arc::new(InMemoryCandidateCache::new(1800));
        let adapter = adapter(provider.clone(), cache.clone());

        let first = adapter.fetch_candidates(&query(SourceKind::Places)).await;
        let second = adapter.fetch_candidates(&query(SourceKind::Places)).await;

        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1, "second call should be a cache hit");
        assert_eq!(
            cache.get(&query(SourceKind::Places).cache_key()).await.map(|hit| hit.len()),
            Some(10)
        );
    }

    #[tokio::test]
    async fn failures_fall_back_and_are_retried_next_time() {
        let provider = StubProvider::failing(FetchFailure::Timeout);
        let cache = Arc::new(InMemoryCandidateCache::new(1800));
        let adapter = adapter(provider.clone(), cache.clone());

        let first = adapter.fetch_candidates(&query(SourceKind::Places)).await;
        adapter.fetch_candidates(&query(SourceKind::Places)).await;

        assert_eq!(first, fallback_candidates(SourceKind::Places));
        assert_eq!(provider.calls(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn default_config_leaves_both_providers_unconfigured() {
        let adapter =
            SourceAdapter::from_config(&planpal_core::config::AppConfig::default().providers)
                .expect("client");

        assert!(!adapter.slot(SourceKind::Places).is_configured());
        assert!(!adapter.slot(SourceKind::Movies).is_configured());
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let config = ProvidersConfig {
            places_api_key: Some(String::from("  ").into()),
            movies_api_key: Some(String::from("tmdb-key").into()),
            ..planpal_core::config::AppConfig::default().providers
        };

        let adapter = SourceAdapter::from_config(&config).expect("client");

        assert!(!adapter.slot(SourceKind::Places).is_configured());
        assert!(adapter.slot(SourceKind::Movies).is_configured());
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    fn client(timeout: Duration) -> Client {
        Client::builder().timeout(timeout).build().expect("client")
    }

    fn places_provider(base: &str) -> PlacesProvider {
        PlacesProvider::new(client(Duration::from_secs(5)), base, "key".to_string().into(), 5000)
    }

    fn movies_provider(base: &str, timeout: Duration) -> MoviesProvider {
        MoviesProvider::new(client(timeout), base, "key".to_string().into(), "en-IN")
    }

    #[tokio::test]
    async fn places_provider_reads_ok_payloads() {
        let base = serve(Router::new().route(
            "/maps/api/place/nearbysearch/json",
            get(|| async {
                Json(json!({
                    "status": "OK",
                    "results": [{"place_id": "p1", "name": "Blue Tokai", "rating": 4.6,
                                 "price_level": 2, "types": ["cafe"]}]
                }))
            }),
        ))
        .await;
        let provider = places_provider(&base);

        let candidates = provider.fetch(&query(SourceKind::Places)).await.expect("fetch");

        assert_eq!(candidates.len(), 1);
        assert!(matches!(
            &candidates[0],
            RawCandidate::Place(place) if place.name.as_deref() == Some("Blue Tokai")
        ));
    }

    #[tokio::test]
    async fn places_provider_rejects_non_ok_status() {
        let base = serve(Router::new().route(
            "/maps/api/place/nearbysearch/json",
            get(|| async { Json(json!({"status": "REQUEST_DENIED", "results": []})) }),
        ))
        .await;
        let provider = places_provider(&base);

        let failure = provider.fetch(&query(SourceKind::Places)).await.expect_err("denied");

        assert_eq!(failure.reason(), "payload");
    }

    #[tokio::test]
    async fn movies_provider_maps_http_errors_and_missing_results() {
        let base = serve(
            Router::new()
                .route("/3/discover/movie", get(|| async { StatusCode::UNAUTHORIZED }))
                .route("/broken/3/discover/movie", get(|| async { Json(json!({"page": 1})) })),
        )
        .await;

        let unauthorized = movies_provider(&base, Duration::from_secs(5));
        let broken = movies_provider(&format!("{base}/broken"), Duration::from_secs(5));

        assert_eq!(
            unauthorized.fetch(&query(SourceKind::Movies)).await,
            Err(FetchFailure::Status(401))
        );
        let failure = broken.fetch(&query(SourceKind::Movies)).await.expect_err("no results");
        assert_eq!(failure.reason(), "payload");
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let base = serve(Router::new().route(
            "/3/discover/movie",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Json(json!({"results": []}))
            }),
        ))
        .await;
        let provider = movies_provider(&base, Duration::from_millis(50));

        assert_eq!(provider.fetch(&query(SourceKind::Movies)).await, Err(FetchFailure::Timeout));
    }
}
