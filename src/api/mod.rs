pub mod error;
mod http;
pub mod nominatim;
pub mod overpass;

pub use error::{FacilityQueryError, GeocodeError, UpstreamError};
pub use nominatim::{NominatimClient, parse_geocode_response};
pub use overpass::{
    DEFAULT_FACILITY_CATEGORY, DEFAULT_SEARCH_RADIUS_METERS, ElementKind, OverpassClient,
    RawFacilityElement, build_facility_query, parse_facility_response,
};

use crate::domain::{GeoPoint, LocationQuery};

/// Resolves a free-text place to a single coordinate
pub trait Geocoder {
    fn geocode(&self, query: &LocationQuery) -> Result<GeoPoint, GeocodeError>;
}

/// Lists raw map elements tagged with a facility category around a point
pub trait FacilitySource {
    fn find_facilities(
        &self,
        center: GeoPoint,
        radius_meters: u32,
        category: &str,
    ) -> Result<Vec<RawFacilityElement>, FacilityQueryError>;
}
