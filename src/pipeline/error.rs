use std::fmt;
use thiserror::Error;

use crate::api::{GeocodeError, UpstreamError};

/// Which external service a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Geocoding,
    FacilityQuery,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Geocoding => f.write_str("geocoding"),
            Service::FacilityQuery => f.write_str("facility search"),
        }
    }
}

/// Why a search ended in `Failed`. Each kind maps to one user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Location not found. Please try a different location.")]
    NotFound,

    #[error("Could not retrieve a valid latitude and longitude for the specified location.")]
    InvalidCoordinates,

    #[error("The {service} service returned HTTP error {status}.")]
    UpstreamHttpError { service: Service, status: u16 },

    #[error("The request to the {service} service timed out. Please try again later.")]
    UpstreamTimeout { service: Service },

    #[error("An error occurred while contacting the {service} service: {detail}")]
    UpstreamNetworkError { service: Service, detail: String },

    #[error("Received an invalid response from the {service} service: {detail}")]
    MalformedUpstreamResponse { service: Service, detail: String },
}

impl SearchError {
    pub fn from_upstream(service: Service, err: UpstreamError) -> Self {
        match err {
            UpstreamError::Http(status) => SearchError::UpstreamHttpError { service, status },
            UpstreamError::Timeout => SearchError::UpstreamTimeout { service },
            UpstreamError::Network(detail) => SearchError::UpstreamNetworkError { service, detail },
            UpstreamError::MalformedResponse(detail) => {
                SearchError::MalformedUpstreamResponse { service, detail }
            }
        }
    }

    /// The service at fault, if any
    pub fn service(&self) -> Option<Service> {
        match self {
            SearchError::NotFound | SearchError::InvalidCoordinates => None,
            SearchError::UpstreamHttpError { service, .. }
            | SearchError::UpstreamTimeout { service }
            | SearchError::UpstreamNetworkError { service, .. }
            | SearchError::MalformedUpstreamResponse { service, .. } => Some(*service),
        }
    }
}

impl From<GeocodeError> for SearchError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::NotFound => SearchError::NotFound,
            GeocodeError::InvalidCoordinates => SearchError::InvalidCoordinates,
            GeocodeError::Upstream(e) => SearchError::from_upstream(Service::Geocoding, e),
        }
    }
}
