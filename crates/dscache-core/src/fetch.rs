//! Dataset retrieval from the remote source.
//!
//! The fetcher performs a single retrieval per call and decodes the body as
//! the dataset document. It does not retry; retry policy belongs to the
//! caller.

use crate::config::SourceConfig;
use crate::dataset::Dataset;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Source of dataset documents.
///
/// Seam for substituting the network with an in-process source in tests.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Retrieve a fresh dataset.
    async fn fetch(&self) -> Result<Dataset, FetchError>;
}

/// HTTP dataset source backed by reqwest.
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    /// Create a new HTTP source with the configured request timeout.
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn fetch(&self) -> Result<Dataset, FetchError> {
        debug!(url = %self.url, "Fetching dataset");

        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let dataset: Dataset = serde_json::from_str(&body)?;

        info!(
            version = %dataset.version,
            collections = dataset.collections.len(),
            records = dataset.record_count(),
            "Dataset fetched"
        );

        Ok(dataset)
    }
}
