//! Observability for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency and outcomes, loaded models, auth events)
//! - Structured JSON logging with tracing

use crate::models::{Disease, PredictionOutcome};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for inference latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

static GLOBAL_METRICS: OnceLock<AppMetricsInner> = OnceLock::new();

struct AppMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    models_loaded: IntGauge,
    model_version_info: GaugeVec,
    auth_events_total: IntCounterVec,
}

impl AppMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "mediscan_prediction_latency_seconds",
                "Time spent aligning features and running inference",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "mediscan_predictions_total",
                "Predictions served, by disease and predicted label",
                &["disease", "label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "mediscan_prediction_errors_total",
                "Failed prediction requests, by disease and error kind",
                &["disease", "kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            models_loaded: register_int_gauge!(
                "mediscan_models_loaded",
                "Number of disease models available for inference"
            )
            .expect("Failed to register models_loaded"),

            model_version_info: register_gauge_vec!(
                "mediscan_model_version_info",
                "Version of each loaded model",
                &["disease", "version"]
            )
            .expect("Failed to register model_version_info"),

            auth_events_total: register_int_counter_vec!(
                "mediscan_auth_events_total",
                "Registration and login attempts, by outcome",
                &["event", "outcome"]
            )
            .expect("Failed to register auth_events_total"),
        }
    }
}

/// Handle to the process-wide metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct AppMetrics {
    _private: (),
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppMetrics {
    /// Create a handle, registering the collectors on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AppMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AppMetricsInner {
        GLOBAL_METRICS.get_or_init(AppMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, disease: Disease, label: u8) {
        self.inner()
            .predictions_total
            .with_label_values(&[disease.key(), &label.to_string()])
            .inc();
    }

    /// `disease` is the raw key so unknown keys are counted too
    pub fn inc_prediction_errors(&self, disease: &str, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[disease, kind])
            .inc();
    }

    pub fn set_models_loaded(&self, count: usize) {
        self.inner().models_loaded.set(count as i64);
    }

    pub fn set_model_version(&self, disease: Disease, version: &str) {
        self.inner()
            .model_version_info
            .with_label_values(&[disease.key(), version])
            .set(1.0);
    }

    pub fn inc_auth_event(&self, event: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .auth_events_total
            .with_label_values(&[event, outcome])
            .inc();
    }

    /// Current value of a prediction counter
    pub fn predictions(&self, disease: Disease, label: u8) -> u64 {
        self.inner()
            .predictions_total
            .with_label_values(&[disease.key(), &label.to_string()])
            .get()
    }
}

/// Structured logger for service events
///
/// Every event carries an `event` field and the instance name so logs from
/// several replicas can be told apart.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_prediction(&self, outcome: &PredictionOutcome, elapsed_ms: f64) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            disease = %outcome.disease,
            label = outcome.label,
            confidence = outcome.confidence,
            model_version = %outcome.model_version,
            elapsed_ms = elapsed_ms,
            "Generated prediction"
        );
    }

    pub fn log_prediction_failed(&self, model_key: &str, kind: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            model_key = %model_key,
            kind = %kind,
            error = %error,
            "Prediction failed"
        );
    }

    pub fn log_artifacts_loaded(&self, disease: Disease, version: &str, features: usize) {
        info!(
            event = "artifacts_loaded",
            instance = %self.instance,
            disease = %disease,
            version = %version,
            features = features,
            "Model artifacts loaded"
        );
    }

    pub fn log_artifact_load_failed(&self, disease: Disease, error: &str) {
        warn!(
            event = "artifact_load_failed",
            instance = %self.instance,
            disease = %disease,
            error = %error,
            "Model artifacts failed to load, model disabled"
        );
    }

    pub fn log_user_registered(&self, username: &str) {
        info!(
            event = "user_registered",
            instance = %self.instance,
            username = %username,
            "User registered"
        );
    }

    /// Login attempts; the password is never logged
    pub fn log_login_attempt(&self, username: &str, success: bool) {
        if success {
            info!(
                event = "login_attempt",
                instance = %self.instance,
                username = %username,
                success = true,
                "Login succeeded"
            );
        } else {
            warn!(
                event = "login_attempt",
                instance = %self.instance,
                username = %username,
                success = false,
                "Login rejected"
            );
        }
    }

    pub fn log_startup(&self, version: &str, models_loaded: usize) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            models_loaded = models_loaded,
            "Prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}
