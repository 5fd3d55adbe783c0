use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::http::{build_client, read_success_body};
use super::{GeocodeError, Geocoder, UpstreamError};
use crate::config::ApiConfig;
use crate::domain::{GeoPoint, LocationQuery};

/// Nominatim is asked for the single best match only
pub const GEOCODE_RESULT_LIMIT: u32 = 1;

/// One candidate match from Nominatim.
///
/// Coordinates are decimal degrees encoded as strings. Fields are kept as raw
/// JSON values so a bad coordinate surfaces as `InvalidCoordinates` rather
/// than failing the whole response.
#[derive(Debug, Deserialize)]
struct NominatimResult {
    #[serde(default)]
    lat: Option<Value>,
    #[serde(default)]
    lon: Option<Value>,
    #[serde(default)]
    display_name: Option<Value>,
}

/// Geocoder backed by the Nominatim search endpoint
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    url: String,
}

impl NominatimClient {
    pub fn new(config: &ApiConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: build_client(config)?,
            url: config.nominatim_url.clone(),
        })
    }
}

impl Geocoder for NominatimClient {
    /// Resolve free text to a coordinate with a single request. No retries.
    fn geocode(&self, query: &LocationQuery) -> Result<GeoPoint, GeocodeError> {
        debug!(query = %query, url = %self.url, "geocoding");

        let limit = GEOCODE_RESULT_LIMIT.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("limit", limit.as_str()),
            ])
            .send()
            .map_err(UpstreamError::from_reqwest)?;

        let body = read_success_body(response)?;
        let point = parse_geocode_response(&body)?;

        info!(
            query = %query,
            lat = point.latitude,
            lon = point.longitude,
            "geocoded location"
        );
        Ok(point)
    }
}

/// Turn a Nominatim JSON body into the best-match coordinate
///
/// # Returns
/// * `Ok(GeoPoint)` - First result's lat/lon
/// * `Err(NotFound)` - Empty result list
/// * `Err(InvalidCoordinates)` - lat/lon absent, unparsable or out of range
/// * `Err(Upstream(MalformedResponse))` - Body is not a JSON list of objects
pub fn parse_geocode_response(body: &str) -> Result<GeoPoint, GeocodeError> {
    let results: Vec<NominatimResult> = serde_json::from_str(body).map_err(|e| {
        UpstreamError::MalformedResponse(format!("invalid Nominatim response: {e}"))
    })?;

    let result = results.into_iter().next().ok_or(GeocodeError::NotFound)?;

    if let Some(name) = result.display_name.as_ref().and_then(Value::as_str) {
        debug!(display_name = name, "best match");
    }

    let lat = coordinate(result.lat.as_ref()).ok_or(GeocodeError::InvalidCoordinates)?;
    let lon = coordinate(result.lon.as_ref()).ok_or(GeocodeError::InvalidCoordinates)?;

    GeoPoint::new(lat, lon).ok_or(GeocodeError::InvalidCoordinates)
}

fn coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
