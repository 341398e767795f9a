//! Metrics endpoint client.

use std::time::Duration;

use topokit_core::{FetchError, MetricsRecord};
use topokit_settings::MetricsSettings;
use tracing::{debug, warn};

/// HTTP client for `GET {base}/api/metrics/{project_id}`
#[derive(Debug, Clone)]
pub struct MetricsClient {
    http: reqwest::Client,
    base_url: String,
}

impl MetricsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network {
                url: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &MetricsSettings) -> Result<Self, FetchError> {
        Self::new(
            settings.base_url.clone(),
            Duration::from_millis(settings.timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint for one project
    pub fn url_for(&self, project_id: &str) -> String {
        format!("{}/api/metrics/{}", self.base_url, project_id)
    }

    /// Fetch the metrics record of a project; any non-2xx status fails
    pub async fn fetch(&self, project_id: &str) -> Result<MetricsRecord, FetchError> {
        let url = self.url_for(project_id);
        debug!("Fetching metrics from {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Metrics request to {} answered {}", url, status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .json::<MetricsRecord>()
            .await
            .map_err(|e| FetchError::Decode {
                url,
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_strips_trailing_slash() {
        let client = MetricsClient::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url_for("7"), "http://localhost:5000/api/metrics/7");
    }
}
