// src/infrastructure/gateway/mod.rs
// Strategy calculator backed by a remote generative compute service

pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request};
use hyper_tls::HttpsConnector;

use crate::application::dto::parser::parse_generate_content;
use crate::domain::errors::{GatewayResult, StrategyError};
use crate::domain::models::{StrategyInput, StrategyResult};
use crate::domain::service::StrategyCalculator;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Longest slice of an error body kept in the error message.
const ERROR_BODY_LIMIT: usize = 200;

pub struct RemoteStrategyCalculator {
    client: Client<HttpsConnector<HttpConnector>>,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl RemoteStrategyCalculator {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout: Duration) -> Self {
        let client = Client::builder().build::<_, Body>(HttpsConnector::new());

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn post(&self, body: Vec<u8>) -> GatewayResult<Vec<u8>> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.url())
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, self.api_key.as_str())
            .body(Body::from(body))
            .map_err(|e| StrategyError::Unavailable(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| StrategyError::Unavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| StrategyError::Unavailable(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            let excerpt: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(StrategyError::Unavailable(format!(
                "Compute service returned {}: {}",
                status, excerpt
            )));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl StrategyCalculator for RemoteStrategyCalculator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn compute(&self, input: &StrategyInput) -> GatewayResult<StrategyResult> {
        let request = prompt::build_request(input);
        let body = serde_json::to_vec(&request)
            .map_err(|e| StrategyError::Unavailable(format!("Failed to encode request: {}", e)))?;

        log::debug!("Requesting strategy from {} for {:?}", self.url(), input);

        let bytes = tokio::time::timeout(self.timeout, self.post(body))
            .await
            .map_err(|_| {
                StrategyError::Unavailable(format!("Compute service timed out after {:?}", self.timeout))
            })??;

        match parse_generate_content(&bytes, input) {
            Ok(result) => Ok(result),
            Err(e) => {
                log::error!("Compute service answer rejected: {}", e);
                Err(e)
            }
        }
    }
}
