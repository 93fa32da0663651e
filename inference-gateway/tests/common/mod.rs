#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use inference_gateway::config::{GatewayConfig, VertexConfig};
use inference_gateway::services::PredictionBackend;
use inference_gateway::startup::{build_router, AppState, Application};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

/// Gateway config with defaults plus the given Vertex overrides, on port 0.
pub fn test_config(vars: &[(&str, &str)]) -> GatewayConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    GatewayConfig {
        common: service_core::config::Config {
            port: 0,
            ..Default::default()
        },
        vertex: VertexConfig::from_lookup(|key| vars.get(key).cloned())
            .expect("Failed to build test config"),
    }
}

pub fn router_with(backend: Arc<dyn PredictionBackend>) -> Router {
    build_router(AppState::new(test_config(&[]), backend))
}

pub fn predict_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

/// Drive one request through the router and decode the JSON body.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, text) = send_raw(router, request).await;
    let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
    (status, body)
}

/// Like `send`, but returns the body exactly as written by the gateway.
pub async fn send_raw(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    /// Spawn a real server on a random port.
    pub async fn spawn(config: GatewayConfig, backend: Option<Arc<dyn PredictionBackend>>) -> Self {
        let app = match backend {
            Some(backend) => Application::build_with_backend(config, backend).await,
            None => Application::build(config).await,
        }
        .expect("Failed to build test application");

        let port = app.port();
        tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        let address = format!("http://127.0.0.1:{}", port);

        // Wait for the listener to serve requests
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client
                .get(format!("{}/healthz", address))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Self { address, port }
    }
}
