//! Suggestion scoring and ranking
//!
//! Combines rating, budget fit, poll popularity and proximity to the group
//! centroid into a single weighted score.

mod scoring;

pub use scoring::{
    budget_limit, RankedSuggestion, Scorable, ScoreBreakdown, ScoreCalculator, ScoringContext,
    ScoringWeights,
};

/// Default scoring weights
pub const DEFAULT_WEIGHTS: ScoringWeights =
    ScoringWeights { rating: 0.5, budget_match: 0.2, popularity: 0.2, proximity: 0.1 };

/// Rating assumed when a suggestion carries none
pub const DEFAULT_RATING: f64 = 3.5;

/// Price (INR for two) assumed when a suggestion carries no estimate
pub const DEFAULT_PRICE: i64 = 1000;

/// Budget limit for unrecognised budget levels
pub const FALLBACK_BUDGET_LIMIT: i64 = 2000;

/// Prices up to this multiple of the limit still earn a partial budget match
pub const OVER_BUDGET_TOLERANCE: f64 = 1.2;

/// Maximum distance used by the neutral scoring context
pub const NEUTRAL_MAX_DISTANCE_KM: f64 = 10.0;
