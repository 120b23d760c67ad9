use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::group::GroupId;
use crate::errors::DomainError;
use crate::geo::Coordinates;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub i64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub group_id: GroupId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub location: Option<Coordinates>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewMember {
    pub name: String,
    pub avatar_url: Option<String>,
    pub location: Option<Coordinates>,
}

impl NewMember {
    /// A location is recorded only when both halves of the pair are present.
    pub fn new(
        name: impl Into<String>,
        avatar_url: Option<String>,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvariantViolation("member name must not be empty".into()));
        }

        let location = match (lat, lng) {
            (Some(lat), Some(lng)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    return Err(DomainError::InvariantViolation(format!(
                        "coordinates out of range: ({lat}, {lng})"
                    )));
                }
                Some(Coordinates::new(lat, lng))
            }
            _ => None,
        };

        Ok(Self { name, avatar_url, location })
    }
}

#[cfg(test)]
mod tests {
    use super::NewMember;

    #[test]
    fn location_requires_both_coordinates() {
        let partial = NewMember::new("Rahul", None, Some(12.97), None).expect("member");
        assert_eq!(partial.location, None);

        let full = NewMember::new("Rahul", None, Some(12.97), Some(77.59)).expect("member");
        assert!(full.location.is_some());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(NewMember::new("Priya", None, Some(120.0), Some(77.0)).is_err());
        assert!(NewMember::new("", None, None, None).is_err());
    }
}
