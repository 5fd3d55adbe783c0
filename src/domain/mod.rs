pub mod facility;
pub mod location;

pub use facility::{DEFAULT_FACILITY_NAME, FacilityRecord, SearchOutcome};
pub use location::{GeoPoint, LocationQuery};
