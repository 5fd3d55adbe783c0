use reqwest::blocking::{Client, Response};
use std::time::Duration;
use tracing::debug;

use super::UpstreamError;
use crate::config::ApiConfig;

/// Build a blocking client carrying the identifying User-Agent and fixed timeout
pub fn build_client(config: &ApiConfig) -> Result<Client, UpstreamError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(UpstreamError::from_reqwest)
}

/// Read the body of a 2xx response; anything else becomes `UpstreamError::Http`
pub fn read_success_body(response: Response) -> Result<String, UpstreamError> {
    let status = response.status();
    debug!(status = status.as_u16(), url = %response.url(), "upstream responded");

    if !status.is_success() {
        return Err(UpstreamError::Http(status.as_u16()));
    }

    response.text().map_err(UpstreamError::from_reqwest)
}
