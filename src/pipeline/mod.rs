//! Location search pipeline: text → coordinate → nearby elements → records.
//!
//! Stages run strictly in sequence on the calling thread. Any failure ends the
//! search immediately; there is no partial result and no retry.

pub mod error;

pub use error::{SearchError, Service};

use tracing::{debug, warn};

use crate::api::{DEFAULT_FACILITY_CATEGORY, DEFAULT_SEARCH_RADIUS_METERS, FacilitySource, Geocoder};
use crate::domain::{LocationQuery, SearchOutcome};
use crate::osm::normalize;

/// Where a search currently is. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Geocoding,
    Querying,
    Normalizing,
    Done(SearchOutcome),
    Failed(SearchError),
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchState::Done(_) | SearchState::Failed(_))
    }
}

/// Inputs of one user-triggered search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub location: String,
    pub radius_meters: u32,
    pub category: String,
}

impl SearchRequest {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            radius_meters: DEFAULT_SEARCH_RADIUS_METERS,
            category: DEFAULT_FACILITY_CATEGORY.to_string(),
        }
    }

    pub fn with_radius(mut self, radius_meters: u32) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// Runs searches against borrowed, stateless clients
pub struct FacilitySearch<'a, G: ?Sized, F: ?Sized> {
    geocoder: &'a G,
    facilities: &'a F,
}

impl<'a, G, F> FacilitySearch<'a, G, F>
where
    G: Geocoder + ?Sized,
    F: FacilitySource + ?Sized,
{
    pub fn new(geocoder: &'a G, facilities: &'a F) -> Self {
        Self {
            geocoder,
            facilities,
        }
    }

    /// Run one search to a terminal state
    pub fn run(&self, request: &SearchRequest) -> SearchState {
        self.run_with(request, |_| {})
    }

    /// Run one search, reporting every state entered to `observe`
    ///
    /// The returned state is the last one passed to `observe`.
    pub fn run_with(
        &self,
        request: &SearchRequest,
        mut observe: impl FnMut(&SearchState),
    ) -> SearchState {
        let mut enter = |state: SearchState| {
            debug!(?state, "search state");
            observe(&state);
            state
        };

        enter(SearchState::Idle);
        enter(SearchState::Geocoding);

        // Blank input cannot resolve to anything, so don't ask the geocoder
        let Some(query) = LocationQuery::new(&request.location) else {
            return enter(SearchState::Failed(SearchError::NotFound));
        };

        let origin = match self.geocoder.geocode(&query) {
            Ok(point) => point,
            Err(e) => {
                warn!(query = %query, error = %e, "geocoding failed");
                return enter(SearchState::Failed(e.into()));
            }
        };

        enter(SearchState::Querying);
        let result = self
            .facilities
            .find_facilities(origin, request.radius_meters, &request.category);
        let elements = match result {
            Ok(elements) => elements,
            Err(e) => {
                warn!(error = %e, "facility query failed");
                let err = SearchError::from_upstream(Service::FacilityQuery, e);
                return enter(SearchState::Failed(err));
            }
        };

        enter(SearchState::Normalizing);
        let facilities = normalize(&elements);
        debug!(
            raw = elements.len(),
            kept = facilities.len(),
            "normalized facility elements"
        );

        enter(SearchState::Done(SearchOutcome { origin, facilities }))
    }
}
