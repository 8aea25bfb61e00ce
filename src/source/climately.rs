use crate::archive::ArchiveExtractor;
use crate::error::{ConfigError, FetchError};
use crate::models::ObservationBatch;
use crate::readers::ObservationReader;
use crate::source::WeatherDataSource;
use crate::utils::constants::{DEFAULT_EXPECTED_ENTRY, USER_AGENT};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

/// Fetches the all-stations current-conditions archive from the Climately API.
pub struct ClimatelySource {
    client: Client,
    snapshot_url: Url,
    redacted_url: Url,
    extractor: ArchiveExtractor,
    reader: ObservationReader,
}

impl ClimatelySource {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("API key must not be empty".to_string()));
        }

        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::Invalid(format!("Invalid base URL '{}': {}", base_url, e)))?;
        let snapshot_url = build_snapshot_url(&base, api_key)?;
        let redacted_url = build_snapshot_url(&base, "REDACTED")?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            snapshot_url,
            redacted_url,
            extractor: ArchiveExtractor::new(DEFAULT_EXPECTED_ENTRY),
            reader: ObservationReader::new(),
        })
    }

    pub fn with_expected_entry(mut self, expected_entry: impl Into<String>) -> Self {
        self.extractor = ArchiveExtractor::new(expected_entry);
        self
    }

    /// Snapshot URL with the API key masked, safe for logs
    pub fn display_url(&self) -> &Url {
        &self.redacted_url
    }
}

fn build_snapshot_url(base: &Url, api_key: &str) -> Result<Url, ConfigError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ConfigError::Invalid(format!("Base URL '{}' cannot carry a path", base)))?
        .pop_if_empty()
        .extend(["v1", api_key, "current", "all.zip"]);
    Ok(url)
}

#[async_trait]
impl WeatherDataSource for ClimatelySource {
    async fn fetch(&self) -> Result<ObservationBatch, FetchError> {
        tracing::debug!(message = "requesting observation snapshot", url = %self.redacted_url);

        let response = self
            .client
            .get(self.snapshot_url.clone())
            .send()
            .await
            .map_err(FetchError::from)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(FetchError::from)?;
        let fetched_at = Utc::now();
        tracing::debug!(message = "received snapshot archive", bytes = body.len());

        let table = self.extractor.extract(&body)?;
        let observations = self.reader.read_observations(&table)?;

        Ok(ObservationBatch::new(fetched_at, observations))
    }
}
