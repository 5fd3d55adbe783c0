use serde::Serialize;

use super::GeoPoint;

/// Name used when the upstream element carries no `name` tag
pub const DEFAULT_FACILITY_NAME: &str = "Unnamed Hospital";

/// A facility ready for display: a name and a single coordinate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityRecord {
    pub name: String,
    pub location: GeoPoint,
}

impl FacilityRecord {
    pub fn new(name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// Result of a completed search: where the user is and what was found around them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub origin: GeoPoint,
    pub facilities: Vec<FacilityRecord>,
}

impl SearchOutcome {
    /// True when the search succeeded but nothing matched in the radius
    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}
