//! Client for the external agent that produces sample test data.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::model::DataMap;

#[derive(Debug, Error)]
pub enum TestDataError {
    #[error("Test data agent returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse test data response: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TestDataError {
    fn from(err: reqwest::Error) -> Self {
        TestDataError::Network(err.to_string())
    }
}

/// Produces sample data for an entity.
#[async_trait]
pub trait TestDataClient: Send + Sync {
    /// Sample data for `entity_type`, or `None` when the agent has nothing.
    async fn generate_sample(
        &self,
        entity_type: &str,
        context: &DataMap,
    ) -> Result<Option<Value>, TestDataError>;
}

/// Test data agent reached over HTTP.
///
/// Posts `{entity_type, context, count}` to `{endpoint}/generate` and reads
/// either a `data` field or the whole body as the sample.
pub struct HttpTestDataClient {
    endpoint: String,
    client: Client,
}

impl HttpTestDataClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Serialize)]
struct SampleRequest<'a> {
    entity_type: &'a str,
    context: &'a DataMap,
    count: u32,
}

#[async_trait]
impl TestDataClient for HttpTestDataClient {
    async fn generate_sample(
        &self,
        entity_type: &str,
        context: &DataMap,
    ) -> Result<Option<Value>, TestDataError> {
        let url = format!("{}/generate", self.endpoint);
        debug!(%url, entity_type, "requesting sample test data");

        let response = self
            .client
            .post(&url)
            .json(&SampleRequest {
                entity_type,
                context,
                count: 1,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TestDataError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TestDataError::ParseError(e.to_string()))?;

        Ok(extract_sample(body))
    }
}

fn extract_sample(body: Value) -> Option<Value> {
    let sample = match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data")?,
        other => other,
    };
    (!sample.is_null()).then_some(sample)
}
