use crate::api::RawFacilityElement;
use crate::domain::{DEFAULT_FACILITY_NAME, FacilityRecord, GeoPoint};
use tracing::debug;

/// Flatten Overpass elements into displayable facility records
///
/// # Algorithm
/// For each element, in upstream order:
/// - name from the `name` tag, else [`DEFAULT_FACILITY_NAME`]
/// - coordinate from direct `lat`/`lon` (nodes), else from `center`
///   (ways and relations)
/// - elements with neither, or with an out-of-range coordinate, are dropped
///
/// No sorting and no de-duplication: a hospital mapped as both a node and a
/// building way shows up twice.
pub fn normalize(elements: &[RawFacilityElement]) -> Vec<FacilityRecord> {
    elements
        .iter()
        .filter_map(|element| {
            let Some(location) = resolve_location(element) else {
                debug!(
                    id = ?element.id,
                    kind = ?element.kind,
                    "dropping element without coordinates"
                );
                return None;
            };

            let name = element
                .tags
                .get("name")
                .map(String::as_str)
                .unwrap_or(DEFAULT_FACILITY_NAME);

            Some(FacilityRecord::new(name, location))
        })
        .collect()
}

fn resolve_location(element: &RawFacilityElement) -> Option<GeoPoint> {
    let (lat, lon) = match (element.lat, element.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            let center = element.center?;
            (center.lat?, center.lon?)
        }
    };

    GeoPoint::new(lat, lon)
}
