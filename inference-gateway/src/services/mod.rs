pub mod backends;
pub mod metrics;

pub use backends::{BackendError, PredictionBackend};
pub use backends::vertex::VertexClient;
