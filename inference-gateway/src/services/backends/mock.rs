//! Mock backend for testing.

use super::{BackendError, PredictionBackend};
use crate::models::Instance;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

enum Behavior {
    /// Return each instance back as its own prediction.
    Echo,
    Fixed(Vec<Value>),
    Fail(BackendError),
}

/// In-process backend with a scripted outcome and a call counter.
pub struct MockBackend {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn echo() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    pub fn fixed(predictions: Vec<Value>) -> Self {
        Self::with_behavior(Behavior::Fixed(predictions))
    }

    pub fn failing(error: BackendError) -> Self {
        Self::with_behavior(Behavior::Fail(error))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `predict` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PredictionBackend for MockBackend {
    async fn predict(&self, instances: &[Instance]) -> Result<Vec<Value>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            Behavior::Echo => Ok(instances
                .iter()
                .cloned()
                .map(Value::Object)
                .collect()),
            Behavior::Fixed(predictions) => Ok(predictions.clone()),
            Behavior::Fail(error) => Err(error.clone()),
        }
    }

    fn endpoint(&self) -> &str {
        "projects/mock/locations/local/endpoints/mock"
    }
}
