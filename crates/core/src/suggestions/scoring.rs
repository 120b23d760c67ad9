//! Weighted scoring for group suggestions

use std::cmp::Ordering;

use super::{
    DEFAULT_PRICE, DEFAULT_RATING, DEFAULT_WEIGHTS, FALLBACK_BUDGET_LIMIT,
    NEUTRAL_MAX_DISTANCE_KM, OVER_BUDGET_TOLERANCE,
};
use crate::domain::group::BudgetLevel;
use crate::domain::suggestion::{NewSuggestion, Suggestion, MAX_RATING};

/// Weights for scoring components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Weight for the normalised rating (default: 0.5)
    pub rating: f64,
    /// Weight for price fit against the group budget (default: 0.2)
    pub budget_match: f64,
    /// Weight for share of poll votes (default: 0.2)
    pub popularity: f64,
    /// Weight for closeness to the group centroid (default: 0.1)
    pub proximity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

/// Anything with a rating and a price estimate can be scored.
pub trait Scorable {
    fn rating(&self) -> Option<f64>;
    fn price_estimate(&self) -> Option<i64>;
}

impl Scorable for Suggestion {
    fn rating(&self) -> Option<f64> {
        self.rating
    }

    fn price_estimate(&self) -> Option<i64> {
        self.price_estimate
    }
}

impl Scorable for NewSuggestion {
    fn rating(&self) -> Option<f64> {
        self.rating
    }

    fn price_estimate(&self) -> Option<i64> {
        self.price_estimate
    }
}

/// Group-level inputs for a single score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringContext {
    pub budget: BudgetLevel,
    pub votes: u32,
    pub max_votes: u32,
    pub distance_km: f64,
    pub max_distance_km: f64,
}

impl ScoringContext {
    /// No vote or distance information: zero of one vote, zero of ten km.
    pub fn neutral(budget: BudgetLevel) -> Self {
        Self {
            budget,
            votes: 0,
            max_votes: 1,
            distance_km: 0.0,
            max_distance_km: NEUTRAL_MAX_DISTANCE_KM,
        }
    }
}

/// Per-component scores before weighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub rating: f64,
    pub budget_match: f64,
    pub popularity: f64,
    pub proximity: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedSuggestion<'a, T> {
    pub item: &'a T,
    pub score: f64,
}

/// Upper price (INR for two) that counts as a full budget match.
pub fn budget_limit(budget: &BudgetLevel) -> i64 {
    match budget {
        BudgetLevel::Low => 1000,
        BudgetLevel::Medium => 2000,
        BudgetLevel::High => 4000,
        BudgetLevel::Other(_) => FALLBACK_BUDGET_LIMIT,
    }
}

/// Score calculator for suggestions
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    weights: ScoringWeights,
}

impl ScoreCalculator {
    /// Create a new score calculator with default weights
    pub fn new() -> Self {
        Self { weights: ScoringWeights::default() }
    }

    /// Create with custom weights
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score<T: Scorable + ?Sized>(&self, item: &T, context: &ScoringContext) -> f64 {
        self.breakdown(item, context).total
    }

    pub fn breakdown<T: Scorable + ?Sized>(
        &self,
        item: &T,
        context: &ScoringContext,
    ) -> ScoreBreakdown {
        let rating = rating_score(item.rating());
        let budget_match = budget_match_score(item.price_estimate(), &context.budget);
        let popularity = popularity_score(context.votes, context.max_votes);
        let proximity = proximity_score(context.distance_km, context.max_distance_km);

        let total = rating * self.weights.rating
            + budget_match * self.weights.budget_match
            + popularity * self.weights.popularity
            + proximity * self.weights.proximity;

        ScoreBreakdown { rating, budget_match, popularity, proximity, total }
    }

    /// Scores every item and returns the best `limit`, highest first.
    ///
    /// Equal scores keep their input order.
    pub fn rank<'a, T, F>(
        &self,
        items: &'a [T],
        context_for: F,
        limit: usize,
    ) -> Vec<RankedSuggestion<'a, T>>
    where
        T: Scorable,
        F: Fn(&T) -> ScoringContext,
    {
        let mut ranked = items
            .iter()
            .map(|item| RankedSuggestion { item, score: self.score(item, &context_for(item)) })
            .collect::<Vec<_>>();

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked.truncate(limit);
        ranked
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn rating_score(rating: Option<f64>) -> f64 {
    rating.unwrap_or(DEFAULT_RATING) / MAX_RATING
}

fn budget_match_score(price: Option<i64>, budget: &BudgetLevel) -> f64 {
    let price = price.unwrap_or(DEFAULT_PRICE) as f64;
    let limit = budget_limit(budget) as f64;

    if price <= limit {
        1.0
    } else if price <= limit * OVER_BUDGET_TOLERANCE {
        0.5
    } else {
        0.1
    }
}

fn popularity_score(votes: u32, max_votes: u32) -> f64 {
    if max_votes == 0 {
        return 0.0;
    }
    f64::from(votes) / f64::from(max_votes)
}

fn proximity_score(distance_km: f64, max_distance_km: f64) -> f64 {
    if max_distance_km == 0.0 {
        return 0.5;
    }
    (1.0 - distance_km / max_distance_km).max(0.0)
}
