use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::group::GroupId;
use crate::geo::Coordinates;

pub const MAX_RATING: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(pub i64);

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Place,
    Movie,
    Experience,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::Movie => "movie",
            Self::Experience => "experience",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "place" => Some(Self::Place),
            "movie" => Some(Self::Movie),
            "experience" => Some(Self::Experience),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceMetadata {
    pub location: Option<Coordinates>,
    pub types: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieMetadata {
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceMetadata {
    pub time_commitment: Option<String>,
    pub perks: Option<String>,
    pub image_url: Option<String>,
}

/// Provider-specific details; the variant decides the suggestion kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionMetadata {
    Place(PlaceMetadata),
    Movie(MovieMetadata),
    Experience(ExperienceMetadata),
}

impl SuggestionMetadata {
    pub fn kind(&self) -> SuggestionKind {
        match self {
            Self::Place(_) => SuggestionKind::Place,
            Self::Movie(_) => SuggestionKind::Movie,
            Self::Experience(_) => SuggestionKind::Experience,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub group_id: GroupId,
    pub source_id: Option<String>,
    pub title: String,
    pub description: String,
    pub rating: Option<f64>,
    pub price_estimate: Option<i64>,
    pub metadata: SuggestionMetadata,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn kind(&self) -> SuggestionKind {
        self.metadata.kind()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewSuggestion {
    pub source_id: Option<String>,
    pub title: String,
    pub description: String,
    pub rating: Option<f64>,
    pub price_estimate: Option<i64>,
    pub metadata: SuggestionMetadata,
}

impl NewSuggestion {
    pub fn kind(&self) -> SuggestionKind {
        self.metadata.kind()
    }
}

/// Keeps ratings inside `[0, 5]`; NaN is treated as absent.
pub fn clamp_rating(rating: f64) -> Option<f64> {
    if rating.is_nan() {
        return None;
    }
    Some(rating.clamp(0.0, MAX_RATING))
}
