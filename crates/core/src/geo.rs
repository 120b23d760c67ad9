//! Great-circle distance and member centroid helpers.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Fallback location (Bengaluru city centre) used when no member shared coordinates.
pub const DEFAULT_LOCATION: Coordinates = Coordinates { lat: 12.9716, lng: 77.5946 };

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Arithmetic mean of each coordinate, or [`DEFAULT_LOCATION`] for an empty set.
pub fn centroid<I>(points: I) -> Coordinates
where
    I: IntoIterator<Item = Coordinates>,
{
    let (count, lat_sum, lng_sum) = points
        .into_iter()
        .fold((0usize, 0.0, 0.0), |(count, lat, lng), point| {
            (count + 1, lat + point.lat, lng + point.lng)
        });

    if count == 0 {
        return DEFAULT_LOCATION;
    }

    Coordinates { lat: lat_sum / count as f64, lng: lng_sum / count as f64 }
}
