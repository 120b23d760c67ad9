use tracing::debug;

use crate::domain::suggestion::{
    clamp_rating, MovieMetadata, NewSuggestion, PlaceMetadata, SuggestionMetadata,
};

use super::{RawCandidate, RawMovie, RawPlace, MAX_NEW_SUGGESTIONS};

const DEFAULT_PLACE_RATING: f64 = 4.0;
const DEFAULT_MOVIE_VOTE_AVERAGE: f64 = 7.0;
const DEFAULT_PRICE_TIER: i64 = 1;
const UNKNOWN_TIER_PRICE: i64 = 1000;
/// Two movie tickets.
const MOVIE_PRICE: i64 = 600;

/// INR-for-two estimate for a Google price tier.
pub fn price_for_tier(tier: Option<i64>) -> i64 {
    match tier.unwrap_or(DEFAULT_PRICE_TIER) {
        0 => 300,
        1 => 700,
        2 => 1500,
        3 => 3000,
        4 => 4500,
        _ => UNKNOWN_TIER_PRICE,
    }
}

pub fn normalize(candidate: &RawCandidate) -> NewSuggestion {
    match candidate {
        RawCandidate::Place(place) => normalize_place(place),
        RawCandidate::Movie(movie) => normalize_movie(movie),
    }
}

/// Normalises the leading candidates, never more than [`MAX_NEW_SUGGESTIONS`].
pub fn normalize_batch(candidates: &[RawCandidate]) -> Vec<NewSuggestion> {
    if candidates.len() > MAX_NEW_SUGGESTIONS {
        debug!(
            event_name = "suggestions.normalize.truncated",
            received = candidates.len(),
            kept = MAX_NEW_SUGGESTIONS,
            "dropping candidates beyond the per-request cap"
        );
    }
    candidates.iter().take(MAX_NEW_SUGGESTIONS).map(normalize).collect()
}

fn normalize_place(place: &RawPlace) -> NewSuggestion {
    NewSuggestion {
        source_id: place.place_id.clone(),
        title: place.name.clone().unwrap_or_else(|| "Unknown Place".to_string()),
        description: place.vicinity.clone().unwrap_or_default(),
        rating: clamp_rating(place.rating.unwrap_or(DEFAULT_PLACE_RATING)),
        price_estimate: Some(price_for_tier(place.price_level)),
        metadata: SuggestionMetadata::Place(PlaceMetadata {
            location: place.geometry.as_ref().and_then(|geometry| geometry.location),
            types: place.types.clone(),
            image_url: None,
        }),
    }
}

fn normalize_movie(movie: &RawMovie) -> NewSuggestion {
    let vote_average = movie.vote_average.unwrap_or(DEFAULT_MOVIE_VOTE_AVERAGE);
    NewSuggestion {
        source_id: movie.id.map(|id| id.to_string()),
        title: movie.title.clone().unwrap_or_else(|| "Unknown Movie".to_string()),
        description: movie.overview.clone().unwrap_or_default(),
        rating: clamp_rating(vote_average / 2.0),
        price_estimate: Some(MOVIE_PRICE),
        metadata: SuggestionMetadata::Movie(MovieMetadata {
            poster_path: movie.poster_path.clone(),
            release_date: movie.release_date.clone(),
        }),
    }
}
