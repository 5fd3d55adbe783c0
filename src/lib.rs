//! nearcare - Find hospitals and other care facilities near a place using OpenStreetMap data

pub mod api;
pub mod config;
pub mod domain;
pub mod osm;
pub mod pipeline;

pub use api::{FacilitySource, Geocoder, NominatimClient, OverpassClient};
pub use domain::{FacilityRecord, GeoPoint, LocationQuery, SearchOutcome};
pub use pipeline::{FacilitySearch, SearchError, SearchRequest, SearchState};
