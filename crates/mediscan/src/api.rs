//! HTTP API: predictions, accounts, model metadata, health and metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mediscan_lib::{
    error::DatasetError,
    health::{components, ComponentStatus, HealthRegistry},
    observability::{AppMetrics, StructuredLogger},
    AppContext, CredentialError, Disease, PredictionError, PredictionOutcome, RawInputRecord,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// `disease` label recorded for prediction errors on unrecognized model keys
pub const UNKNOWN_MODEL_LABEL: &str = "unknown";

/// Shared application state
pub struct AppState {
    pub context: Arc<AppContext>,
    pub health_registry: HealthRegistry,
    pub metrics: AppMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        context: AppContext,
        health_registry: HealthRegistry,
        metrics: AppMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            context: Arc::new(context),
            health_registry,
            metrics,
            logger,
        }
    }

    /// Publish startup load results to health, metrics and logs, then mark ready
    pub async fn initialize(&self) {
        let context = &self.context;
        for disease in Disease::ALL {
            match context.adapter.bundle(disease) {
                Some(bundle) => {
                    self.metrics.set_model_version(disease, bundle.version());
                    self.logger.log_artifacts_loaded(
                        disease,
                        bundle.version(),
                        bundle.expected_features().len(),
                    );
                    self.health_registry.record_model(disease, None).await;
                }
                None => {
                    let reason = context.load_failure(disease).unwrap_or("model not loaded");
                    self.logger.log_artifact_load_failed(disease, reason);
                    self.health_registry.record_model(disease, Some(reason)).await;
                }
            }
        }

        let loaded = context.models_loaded();
        self.metrics.set_models_loaded(loaded);
        self.health_registry.record_predictor(loaded).await;

        match context.credentials.check() {
            Ok(users) => {
                info!(
                    users,
                    path = %context.credentials.path().display(),
                    "Credential store ready"
                );
                self.health_registry.register(components::CREDENTIAL_STORE).await;
            }
            Err(e) => {
                self.health_registry
                    .set_degraded(components::CREDENTIAL_STORE, e.to_string())
                    .await;
            }
        }

        self.health_registry.set_ready(true).await;
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: RawInputRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub disease: Disease,
    pub display_name: String,
    pub label: u8,
    pub result: String,
    pub confidence: f64,
    pub confidence_display: String,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

fn error_response(status: StatusCode, kind: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            kind: kind.to_string(),
        }),
    )
        .into_response()
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "metrics", e.to_string());
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

fn auth_failure_status(e: &CredentialError, on_mismatch: StatusCode) -> StatusCode {
    match e {
        CredentialError::UserExists => StatusCode::CONFLICT,
        CredentialError::InvalidCredentials | CredentialError::IncompleteRecord => on_mismatch,
        CredentialError::EmptyCredentials | CredentialError::InvalidEmail => on_mismatch,
        CredentialError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Track credential store health from the outcome of a register or login
async fn record_credential_health(state: &AppState, result: &Result<String, CredentialError>) {
    match result {
        Err(e) if !e.is_user_error() => {
            error!(error = %e, "Credential store failure");
            state
                .health_registry
                .set_degraded(components::CREDENTIAL_STORE, e.to_string())
                .await;
        }
        Ok(_) => {
            state
                .health_registry
                .set_healthy(components::CREDENTIAL_STORE)
                .await;
        }
        Err(_) => {}
    }
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let context = state.context.clone();
    let username = request.username.clone();
    let result = tokio::task::spawn_blocking(move || {
        context
            .credentials
            .register(&request.username, &request.password, request.email.as_deref())
    })
    .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
        }
    };

    state.metrics.inc_auth_event("register", result.is_ok());
    record_credential_health(&state, &result).await;
    match result {
        Ok(message) => {
            state.logger.log_user_registered(username.trim());
            (
                StatusCode::CREATED,
                Json(AuthResponse {
                    success: true,
                    message,
                }),
            )
                .into_response()
        }
        Err(e) => {
            (
                auth_failure_status(&e, StatusCode::BAD_REQUEST),
                Json(AuthResponse {
                    success: false,
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn login(State(state): State<Arc<AppState>>, Json(request): Json<LoginRequest>) -> Response {
    let context = state.context.clone();
    let username = request.username.clone();
    let result = tokio::task::spawn_blocking(move || {
        context.credentials.verify(&request.username, &request.password)
    })
    .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
        }
    };

    state.metrics.inc_auth_event("login", result.is_ok());
    state.logger.log_login_attempt(username.trim(), result.is_ok());
    record_credential_health(&state, &result).await;
    match result {
        Ok(message) => Json(AuthResponse {
            success: true,
            message,
        })
        .into_response(),
        Err(e) => {
            (
                auth_failure_status(&e, StatusCode::UNAUTHORIZED),
                Json(AuthResponse {
                    success: false,
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.context.model_statuses())
}

async fn model_schema(
    State(state): State<Arc<AppState>>,
    Path(disease): Path<String>,
) -> Response {
    let disease: Disease = match disease.parse() {
        Ok(d) => d,
        Err(e) => return error_response(StatusCode::NOT_FOUND, "unknown_model", format!("{}", e)),
    };
    match state.context.reference.form_schema(disease) {
        Ok(schema) => Json(schema).into_response(),
        Err(e @ DatasetError::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "dataset_not_found", e.to_string())
        }
        Err(e) => {
            error!(disease = %disease, error = %e, "Failed to build form schema");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "dataset", e.to_string())
        }
    }
}

fn prediction_status(e: &PredictionError) -> StatusCode {
    match e {
        PredictionError::UnknownModel(_) | PredictionError::ModelNotLoaded(_) => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Metric label for a requested model key; unrecognized keys share one label
fn error_metric_label(model_key: &str) -> String {
    model_key
        .parse::<Disease>()
        .map(|d| d.key().to_string())
        .unwrap_or_else(|_| UNKNOWN_MODEL_LABEL.to_string())
}

fn predict_response(state: &AppState, outcome: &PredictionOutcome) -> PredictResponse {
    PredictResponse {
        disease: outcome.disease,
        display_name: outcome.disease.display_name().to_string(),
        label: outcome.label,
        result: outcome.result_text().to_string(),
        confidence: outcome.confidence,
        confidence_display: outcome.confidence_display(),
        model_version: outcome.model_version.clone(),
        note: state
            .context
            .adapter
            .output_formatter()
            .low_confidence_reason(outcome),
    }
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Path(model_key): Path<String>,
    Json(request): Json<PredictRequest>,
) -> Response {
    let start = Instant::now();
    let result = state.context.adapter.predict(&model_key, &request.features);
    let elapsed = start.elapsed();
    state
        .metrics
        .observe_prediction_latency(elapsed.as_secs_f64());

    match result {
        Ok(outcome) => {
            state.metrics.inc_predictions(outcome.disease, outcome.label);
            state
                .logger
                .log_prediction(&outcome, elapsed.as_secs_f64() * 1000.0);
            Json(predict_response(&state, &outcome)).into_response()
        }
        Err(e) => {
            state
                .metrics
                .inc_prediction_errors(&error_metric_label(&model_key), e.kind());
            state
                .logger
                .log_prediction_failed(&model_key, e.kind(), &e.to_string());
            error_response(prediction_status(&e), e.kind(), e.to_string())
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/models", get(list_models))
        .route("/api/v1/models/:disease/schema", get(model_schema))
        .route("/api/v1/predict/:disease", post(predict))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
