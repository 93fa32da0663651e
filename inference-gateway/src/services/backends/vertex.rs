//! Vertex AI online prediction client.
//!
//! Calls `POST https://{location}-aiplatform.googleapis.com/v1/{endpoint}:predict`
//! with `{"instances": [...]}` and returns the `predictions` array untouched.

use super::{BackendError, PredictionBackend};
use crate::config::VertexConfig;
use crate::models::Instance;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;
use service_core::observability::TracedClientExt;

/// Token endpoint of the GCE / Cloud Run metadata server.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Where bearer tokens come from.
#[derive(Clone)]
pub enum CredentialSource {
    /// A token supplied through configuration.
    Static(Secret<String>),
    /// Fetched from the metadata server on every call; the server caches
    /// and refreshes the service-account token itself.
    MetadataServer { token_url: String },
}

impl CredentialSource {
    pub fn from_config(config: &VertexConfig) -> Self {
        match &config.access_token {
            Some(token) => CredentialSource::Static(token.clone()),
            None => CredentialSource::MetadataServer {
                token_url: METADATA_TOKEN_URL.to_string(),
            },
        }
    }
}

/// Vertex AI endpoint client. Built once at startup and shared read-only.
pub struct VertexClient {
    client: Client,
    endpoint: String,
    predict_url: String,
    credentials: CredentialSource,
}

#[derive(Serialize)]
struct PredictRequestBody<'a> {
    instances: &'a [Instance],
}

#[derive(Deserialize)]
struct PredictResponseBody {
    predictions: Vec<Value>,
    #[serde(rename = "deployedModelId", default)]
    deployed_model_id: Option<String>,
}

/// Google API error envelope: `{"error": {"code": .., "message": .., "status": ..}}`.
#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl VertexClient {
    pub fn new(config: &VertexConfig) -> Result<Self, AppError> {
        let endpoint = config.endpoint_name()?.to_string();
        let predict_url = config.predict_url()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint,
            predict_url,
            credentials: CredentialSource::from_config(config),
        })
    }

    /// Replace the credential source, e.g. to point at a local metadata stub.
    pub fn with_credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    async fn access_token(&self) -> Result<Secret<String>, BackendError> {
        let token_url = match &self.credentials {
            CredentialSource::Static(token) => return Ok(token.clone()),
            CredentialSource::MetadataServer { token_url } => token_url,
        };

        let response = self
            .client
            .traced_get(token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| BackendError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Auth(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| BackendError::Auth(format!("malformed token response: {}", e)))?;

        Ok(Secret::new(token.access_token))
    }
}

/// Pick the human-readable message out of a failed response body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<GoogleErrorEnvelope>(body) {
        if !envelope.error.message.is_empty() {
            return envelope.error.message;
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl PredictionBackend for VertexClient {
    async fn predict(&self, instances: &[Instance]) -> Result<Vec<Value>, BackendError> {
        let token = self.access_token().await?;

        tracing::debug!(
            endpoint = %self.endpoint,
            instance_count = instances.len(),
            "Sending prediction request to Vertex AI"
        );

        let response = self
            .client
            .traced_post(&self.predict_url)
            .bearer_auth(token.expose_secret())
            .json(&PredictRequestBody { instances })
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let body: PredictResponseBody = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            endpoint = %self.endpoint,
            deployed_model_id = body.deployed_model_id.as_deref().unwrap_or("-"),
            prediction_count = body.predictions.len(),
            "Received predictions from Vertex AI"
        );

        Ok(body.predictions)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
