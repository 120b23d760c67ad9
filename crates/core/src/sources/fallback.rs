use super::{RawCandidate, RawMovie, RawPlace, SourceKind};

pub fn fallback_places() -> Vec<RawPlace> {
    [
        ("mock_1", "Cubbon Park", 4.5, 0),
        ("mock_2", "Wonderla", 4.3, 3),
        ("mock_3", "Cafe Coffee Day", 4.0, 1),
        ("mock_4", "Lalbagh Botanical Garden", 4.6, 0),
    ]
    .into_iter()
    .map(|(place_id, name, rating, price_level)| RawPlace {
        place_id: Some(place_id.to_string()),
        name: Some(name.to_string()),
        rating: Some(rating),
        price_level: Some(price_level),
        ..RawPlace::default()
    })
    .collect()
}

pub fn fallback_movies() -> Vec<RawMovie> {
    [
        (12345, "Zindagi Na Milegi Dobara", 8.1),
        (12346, "Dil Chahta Hai", 8.0),
        (12347, "Queen", 7.8),
        (12348, "3 Idiots", 8.4),
    ]
    .into_iter()
    .map(|(id, title, vote_average)| RawMovie {
        id: Some(id),
        title: Some(title.to_string()),
        vote_average: Some(vote_average),
        ..RawMovie::default()
    })
    .collect()
}

/// Static dataset served when a provider is unconfigured or failing.
pub fn fallback_candidates(kind: SourceKind) -> Vec<RawCandidate> {
    match kind {
        SourceKind::Places => fallback_places().into_iter().map(RawCandidate::Place).collect(),
        SourceKind::Movies => fallback_movies().into_iter().map(RawCandidate::Movie).collect(),
    }
}
