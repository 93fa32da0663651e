//! Prometheus metrics for the inference gateway.
//!
//! HTTP-level metrics come from the `metrics` recorder fed by
//! `service_core::middleware::metrics`; prediction metrics live in a
//! dedicated `prometheus` registry. Both are rendered by `/metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
static REGISTRY: OnceLock<Registry> = OnceLock::new();

static PREDICTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
static PREDICTION_INSTANCES_TOTAL: OnceLock<IntCounter> = OnceLock::new();
static BACKEND_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    });

    REGISTRY.get_or_init(|| {
        let registry = Registry::new();

        // outcome: success, or the backend error kind
        let predictions_total = IntCounterVec::new(
            Opts::new("gateway_predictions_total", "Total prediction requests by outcome"),
            &["outcome"],
        )
        .expect("Failed to create gateway_predictions_total metric");

        let instances_total = IntCounter::new(
            "gateway_prediction_instances_total",
            "Total instances forwarded to the backend",
        )
        .expect("Failed to create gateway_prediction_instances_total metric");

        let backend_latency = HistogramVec::new(
            HistogramOpts::new(
                "gateway_backend_latency_seconds",
                "Model backend call latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["endpoint"],
        )
        .expect("Failed to create gateway_backend_latency_seconds metric");

        registry
            .register(Box::new(predictions_total.clone()))
            .expect("Failed to register gateway_predictions_total");
        registry
            .register(Box::new(instances_total.clone()))
            .expect("Failed to register gateway_prediction_instances_total");
        registry
            .register(Box::new(backend_latency.clone()))
            .expect("Failed to register gateway_backend_latency_seconds");

        let _ = PREDICTIONS_TOTAL.set(predictions_total);
        let _ = PREDICTION_INSTANCES_TOTAL.set(instances_total);
        let _ = BACKEND_LATENCY_SECONDS.set(backend_latency);

        tracing::info!("Prometheus metrics initialized");
        registry
    });
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .and_then(|handle| handle.as_ref())
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    let Some(registry) = REGISTRY.get() else {
        return output;
    };

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return output;
    }

    match String::from_utf8(buffer) {
        Ok(s) => output.push_str(&s),
        Err(e) => tracing::error!(error = %e, "Failed to convert metrics to UTF-8"),
    }

    output
}

/// Record a finished backend call.
pub fn record_prediction(endpoint: &str, outcome: &str, instances: usize, duration_secs: f64) {
    if let Some(counter) = PREDICTIONS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
    if let Some(counter) = PREDICTION_INSTANCES_TOTAL.get() {
        counter.inc_by(instances as u64);
    }
    if let Some(histogram) = BACKEND_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_predictions_are_rendered() {
        init_metrics();
        record_prediction("projects/p/locations/l/endpoints/e", "success", 3, 0.2);

        let rendered = get_metrics();
        assert!(rendered.contains("gateway_predictions_total{outcome=\"success\"}"));
        assert!(rendered.contains("gateway_prediction_instances_total"));
        assert!(rendered.contains("gateway_backend_latency_seconds_bucket"));
    }
}
