use thiserror::Error;

/// Transport-level failure talking to an external service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("service returned HTTP status {0}")]
    Http(u16),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl UpstreamError {
    /// Classify a reqwest failure into one of the distinct upstream kinds
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if let Some(status) = err.status() {
            UpstreamError::Http(status.as_u16())
        } else if err.is_decode() {
            UpstreamError::MalformedResponse(err.to_string())
        } else {
            UpstreamError::Network(error_chain(&err))
        }
    }
}

/// reqwest hides the interesting part (DNS, refused, TLS) in the source chain
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Errors from resolving free text to a coordinate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("location not found")]
    NotFound,
    #[error("geocoder returned missing or unparsable coordinates")]
    InvalidCoordinates,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// The facility query has no domain-level failures, only transport ones
pub type FacilityQueryError = UpstreamError;
