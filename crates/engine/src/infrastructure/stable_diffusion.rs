//! Stable Diffusion backend client
//!
//! Implements the ImageGenPort trait against an AUTOMATIC1111-compatible HTTP API.

use async_trait::async_trait;
use gachadiff_domain::GenerationRequest;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

use crate::infrastructure::config::BackendSettings;
use crate::infrastructure::ports::{BackendResponse, ImageGenError, ImageGenPort};

/// Health probes must answer quickly; generation gets the configured timeout.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the Stable Diffusion HTTP API
#[derive(Clone)]
pub struct StableDiffusionClient {
    client: Client,
    generate_url: String,
    health_url: String,
}

impl StableDiffusionClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, ImageGenError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ImageGenError::RequestFailed(format!("cannot build HTTP client: {e}")))?;

        let base = settings.base_url.as_str().trim_end_matches('/');
        Ok(Self {
            client,
            generate_url: format!("{}{}", base, settings.generate_path),
            health_url: format!("{}{}", base, settings.health_path),
        })
    }

    /// Turn any HTTP answer into a BackendResponse.
    ///
    /// Non-JSON bodies are wrapped as `{"text": ...}` so error pages still reach the user.
    async fn into_backend_response(response: Response) -> Result<BackendResponse, ImageGenError> {
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("Unknown").to_string();

        let text = response.text().await.map_err(map_reqwest_error)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "text": text }))
        };

        Ok(BackendResponse::new(status.as_u16(), reason, body))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ImageGenError {
    if e.is_timeout() {
        ImageGenError::Timeout(e.to_string())
    } else if e.is_decode() {
        ImageGenError::InvalidResponse(e.to_string())
    } else {
        ImageGenError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl ImageGenPort for StableDiffusionClient {
    async fn check_health(&self) -> Result<BackendResponse, ImageGenError> {
        let response = self
            .client
            .get(&self.health_url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Self::into_backend_response(response).await
    }

    async fn generate(&self, request: GenerationRequest) -> Result<BackendResponse, ImageGenError> {
        tracing::debug!(
            url = %self.generate_url,
            steps = request.steps,
            seed = request.seed,
            "Posting generation request"
        );

        let response = self
            .client
            .post(&self.generate_url)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Self::into_backend_response(response).await
    }
}
