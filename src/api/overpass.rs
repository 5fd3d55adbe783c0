use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::http::{build_client, read_success_body};
use super::{FacilityQueryError, FacilitySource, UpstreamError};
use crate::config::ApiConfig;
use crate::domain::GeoPoint;

/// Search radius around the geocoded point
pub const DEFAULT_SEARCH_RADIUS_METERS: u32 = 50_000;

/// `amenity=*` value searched for when none is given
pub const DEFAULT_FACILITY_CATEGORY: &str = "hospital";

/// OSM geometry kind of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
    Other,
}

impl ElementKind {
    fn from_type(type_: &str) -> Self {
        match type_ {
            "node" => ElementKind::Node,
            "way" => ElementKind::Way,
            "relation" => ElementKind::Relation,
            _ => ElementKind::Other,
        }
    }
}

/// Representative point Overpass attaches to ways and relations with `out center`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// A single element from Overpass (node, way or relation)
///
/// Nodes carry `lat`/`lon` directly, ways and relations carry `center`.
/// Every field decodes leniently: a value of the wrong JSON type is treated
/// as absent so one odd element cannot sink the whole result set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFacilityElement {
    #[serde(rename = "type", default = "other_kind", deserialize_with = "lenient_kind")]
    pub kind: ElementKind,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_center")]
    pub center: Option<Center>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: HashMap<String, String>,
}

fn other_kind() -> ElementKind {
    ElementKind::Other
}

fn lenient_kind<'de, D: Deserializer<'de>>(d: D) -> Result<ElementKind, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value
        .as_str()
        .map(ElementKind::from_type)
        .unwrap_or(ElementKind::Other))
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(Value::deserialize(d)?.as_u64())
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(d)?.as_f64())
}

fn lenient_center<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Center>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value.as_object().map(|obj| Center {
        lat: obj.get("lat").and_then(Value::as_f64),
        lon: obj.get("lon").and_then(Value::as_f64),
    }))
}

fn lenient_tags<'de, D: Deserializer<'de>>(d: D) -> Result<HashMap<String, String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default())
}

/// Facility source backed by an Overpass API interpreter
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Client,
    url: String,
}

impl OverpassClient {
    pub fn new(config: &ApiConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: build_client(config)?,
            url: config.overpass_url.clone(),
        })
    }
}

impl FacilitySource for OverpassClient {
    /// Single POST to the interpreter. The service is shared public
    /// infrastructure, so failures are returned immediately.
    fn find_facilities(
        &self,
        center: GeoPoint,
        radius_meters: u32,
        category: &str,
    ) -> Result<Vec<RawFacilityElement>, FacilityQueryError> {
        let query = build_facility_query(center, radius_meters, category);
        debug!(url = %self.url, %query, "querying facilities");

        // Overpass expects form-encoded data=<query>
        let response = self
            .client
            .post(&self.url)
            .form(&[("data", query.as_str())])
            .send()
            .map_err(UpstreamError::from_reqwest)?;

        let body = read_success_body(response)?;
        let elements = parse_facility_response(&body)?;

        info!(
            count = elements.len(),
            radius_m = radius_meters,
            category,
            "fetched facility elements"
        );
        Ok(elements)
    }
}

/// Overpass QL for every node, way and relation tagged `amenity=<category>`
/// within `radius_meters` of `center`.
///
/// `out center` makes Overpass attach a centroid to ways and relations so
/// every element can be placed on a map. No `[timeout:N]` is set: the server
/// default (180s) stays above the client timeout, so a slow query ends as a
/// client-side `Timeout` instead of an empty 200.
pub fn build_facility_query(center: GeoPoint, radius_meters: u32, category: &str) -> String {
    let filter = format!(r#"["amenity"="{}"]"#, escape_ql_string(category));
    let around = format!(
        "(around:{},{},{})",
        radius_meters, center.latitude, center.longitude
    );

    format!(
        r#"[out:json];
(
  node{filter}{around};
  way{filter}{around};
  relation{filter}{around};
);
out center;"#
    )
}

fn escape_ql_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Extract the `elements` list from an Overpass JSON body
pub fn parse_facility_response(body: &str) -> Result<Vec<RawFacilityElement>, FacilityQueryError> {
    let root: Value = serde_json::from_str(body).map_err(|e| {
        UpstreamError::MalformedResponse(format!("invalid Overpass response: {e}"))
    })?;

    let elements = root
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            UpstreamError::MalformedResponse("Overpass response has no `elements` list".into())
        })?;

    // Overpass reports server-side timeouts and memory limits as a remark on a 200
    if let Some(remark) = root.get("remark").and_then(Value::as_str) {
        check_remark(remark)?;
    }

    elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            if !element.is_object() {
                return Err(UpstreamError::MalformedResponse(format!(
                    "Overpass element {index} is not an object"
                )));
            }
            RawFacilityElement::deserialize(element).map_err(|e| {
                UpstreamError::MalformedResponse(format!("Overpass element {index}: {e}"))
            })
        })
        .collect()
}

/// A runtime error remark means the element list is truncated or empty
fn check_remark(remark: &str) -> Result<(), UpstreamError> {
    let lower = remark.to_ascii_lowercase();
    let is_runtime = lower.starts_with("runtime error") || lower.starts_with("runtime remark");

    if !is_runtime {
        warn!(remark, "Overpass returned a remark");
        return Ok(());
    }

    warn!(remark, "Overpass query failed on the server");
    if lower.contains("timed out") {
        Err(UpstreamError::Timeout)
    } else {
        Err(UpstreamError::MalformedResponse(format!(
            "Overpass runtime error: {remark}"
        )))
    }
}
