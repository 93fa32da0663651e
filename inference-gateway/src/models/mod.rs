//! Request and response bodies for the prediction API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One input record. The gateway enforces no schema on its contents.
pub type Instance = Map<String, Value>;

/// Body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub instances: Vec<Instance>,
}

/// Predictions exactly as returned by the backend, in backend order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<Value>,
}
