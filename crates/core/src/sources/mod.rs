//! Candidate records from the places and movies providers.
//!
//! Holds the provider payload shapes, the mood-to-category tables, the static
//! fallback datasets and the normalisation into [`NewSuggestion`] records. The
//! HTTP calls themselves live in the server crate.
//!
//! [`NewSuggestion`]: crate::domain::suggestion::NewSuggestion

mod fallback;
mod normalize;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::group::{BudgetLevel, Mood};
use crate::domain::suggestion::SuggestionKind;
use crate::geo::Coordinates;

pub use fallback::{fallback_candidates, fallback_movies, fallback_places};
pub use normalize::{normalize, normalize_batch, price_for_tier};

/// Providers never contribute more than this many candidates per fetch.
pub const MAX_CANDIDATES: usize = 10;

/// A single generation run persists at most this many suggestions.
pub const MAX_NEW_SUGGESTIONS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Places,
    Movies,
}

impl SourceKind {
    /// Accepts provider names (`google`, `tmdb`) as well as kind names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "google" | "place" | "places" => Some(Self::Places),
            "tmdb" | "movie" | "movies" => Some(Self::Movies),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Places => "places",
            Self::Movies => "movies",
        }
    }

    pub fn suggestion_kind(&self) -> SuggestionKind {
        match self {
            Self::Places => SuggestionKind::Place,
            Self::Movies => SuggestionKind::Movie,
        }
    }
}

/// Places category (Google `type`) searched for a mood.
pub fn place_type_for(mood: &Mood) -> &'static str {
    match mood {
        Mood::Adventurous => "tourist_attraction",
        Mood::Chill => "cafe",
        Mood::Romantic | Mood::Foodie => "restaurant",
        Mood::FunGetaway => "amusement_park",
        Mood::Other(_) => "point_of_interest",
    }
}

/// TMDb genre id discovered for a mood.
pub fn movie_genre_for(mood: &Mood) -> u32 {
    match mood {
        Mood::Adventurous => 12,
        Mood::Chill => 35,
        Mood::Romantic => 10749,
        Mood::Foodie => 99,
        Mood::FunGetaway => 16,
        Mood::Other(_) => 28,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CandidateQuery {
    pub kind: SourceKind,
    pub mood: Mood,
    pub budget: BudgetLevel,
    pub location: Coordinates,
}

impl CandidateQuery {
    /// Stable SHA-256 hex digest over every request parameter.
    pub fn cache_key(&self) -> String {
        let material = format!(
            "{}:{}|{}|{}|{}",
            self.kind.as_str(),
            self.mood.as_str(),
            self.budget.as_str(),
            self.location.lat,
            self.location.lng
        );
        let digest = Sha256::digest(material.as_bytes());
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceGeometry {
    #[serde(default)]
    pub location: Option<Coordinates>,
}

/// Google Places nearby-search result; every field is optional upstream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPlace {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub vicinity: Option<String>,
    pub rating: Option<f64>,
    pub price_level: Option<i64>,
    pub geometry: Option<PlaceGeometry>,
    pub types: Vec<String>,
}

/// TMDb discover result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMovie {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawCandidate {
    Place(RawPlace),
    Movie(RawMovie),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlacesPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<RawPlace>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MoviesPayload {
    pub results: Option<Vec<RawMovie>>,
}
