//! Model-serving backend abstraction.
//!
//! Handlers depend on the `PredictionBackend` trait so the Vertex AI client
//! can be swapped for the mock in tests.

pub mod mock;
pub mod vertex;

use crate::models::Instance;
use async_trait::async_trait;
use serde_json::Value;
use service_core::error::AppError;
use thiserror::Error;

/// Failure while calling the backend.
///
/// The variants only feed logs and metrics; callers always see a single
/// server error carrying the `Display` text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("failed to obtain access token: {0}")]
    Auth(String),

    #[error("{status} {message}")]
    Api { status: u16, message: String },

    #[error("invalid response from prediction endpoint: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Transport(String),
}

impl BackendError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Auth(_) => "auth",
            BackendError::Api { .. } => "api",
            BackendError::InvalidResponse(_) => "invalid_response",
            BackendError::Transport(_) => "transport",
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::UpstreamError(err.to_string())
    }
}

/// A model-serving endpoint that turns instances into predictions.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    /// Forward `instances` unchanged and return the predictions in backend
    /// order.
    async fn predict(&self, instances: &[Instance]) -> Result<Vec<Value>, BackendError>;

    /// Resource name used in logs.
    fn endpoint(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_leads_with_status() {
        let err = BackendError::Api {
            status: 403,
            message: "Permission denied on resource project demo".to_string(),
        };
        assert_eq!(err.to_string(), "403 Permission denied on resource project demo");
        assert_eq!(err.kind(), "api");
    }

    #[test]
    fn converts_to_upstream_app_error() {
        let err: AppError = BackendError::Transport("connection refused".to_string()).into();
        assert!(matches!(err, AppError::UpstreamError(ref msg) if msg == "connection refused"));
    }
}
