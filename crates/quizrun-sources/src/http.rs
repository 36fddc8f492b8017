//! HTTP bank source.

use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use quizrun_core::traits::BankSource;

use crate::error::{parse_payload, SourceError};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A question bank served as a JSON array over HTTP(S).
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self, SourceError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SourceError::Network {
                url: url.clone(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { url, client })
    }

    /// Use a preconfigured client, e.g. one shared across sources.
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_records(&self) -> Result<Vec<serde_json::Value>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Network {
                url: self.url.clone(),
                message: if e.is_timeout() {
                    format!("timed out after {DEFAULT_TIMEOUT_SECS}s")
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.text().await.map_err(|e| SourceError::Network {
            url: self.url.clone(),
            message: format!("failed to read body: {e}"),
        })?;
        let records = parse_payload(&body, &self.url)?;
        tracing::debug!(records = records.len(), "fetched question bank");
        Ok(records)
    }
}

#[async_trait]
impl BankSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> anyhow::Result<Vec<serde_json::Value>> {
        Ok(self.fetch_records().await?)
    }
}
