//! Integration tests for the HTTP API
//!
//! Models are trained from small inline datasets into a temporary
//! directory and loaded through the same path the server uses.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mediscan_lib::{
    artifacts::{FileArtifactStore, ModelArtifactBundle},
    credentials::CredentialStore,
    health::HealthRegistry,
    observability::{AppMetrics, StructuredLogger},
    predictor::{
        CategoricalSchema, FitConfig, InferenceAdapter, LogisticRegression, MeanImputer,
        StandardScaler,
    },
    reference::ReferenceSchemaProvider,
    training::train_and_save,
    AppContext, ContextSettings, Disease,
};
use mediscan_server::api::{create_router, AppState, UNKNOWN_MODEL_LABEL};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const HEART_CSV: &str = "\
age,sex,cp,chol,target
63,1,3,233,1
37,1,2,250,1
41,0,1,204,1
56,1,1,236,1
57,0,0,354,0
57,1,0,192,0
44,1,2,263,1
67,1,0,286,0
62,0,0,268,0
63,1,0,254,0
";

const DIABETES_CSV: &str = "\
Glucose,BMI,Outcome
85,26.6,0
89,28.1,0
78,31,0
90,,0
183,23.3,1
168,38,1
166,25.8,1
197,30.5,1
";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _dir: TempDir,
}

/// Heart and diabetes trained, Parkinson's left without artifacts
async fn setup_test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let models_dir = dir.path().join("models");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("heart.csv"), HEART_CSV).unwrap();
    std::fs::write(data_dir.join("diabetes.csv"), DIABETES_CSV).unwrap();

    let store = FileArtifactStore::new(&models_dir);
    let runs = train_and_save(
        &data_dir,
        &store,
        &[Disease::Diabetes, Disease::Heart],
        &FitConfig::default(),
    );
    assert!(runs.iter().all(|run| run.result.is_ok()));

    let settings = ContextSettings {
        models_dir,
        data_dir,
        users_file: dir.path().join("users.json"),
        password_rounds: 1000,
    };
    let state = build_state(AppContext::load(&settings)).await;
    TestApp {
        router: create_router(state.clone()),
        state,
        _dir: dir,
    }
}

async fn build_state(context: AppContext) -> Arc<AppState> {
    let state = Arc::new(AppState::new(
        context,
        HealthRegistry::new(),
        AppMetrics::new(),
        StructuredLogger::new("test-instance"),
    ));
    state.initialize().await;
    state
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_missing_model_degrades_health() {
    let app = setup_test_app().await;

    let (status, health) = send(&app.router, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["model_parkinson"]["status"], "degraded");
    assert_eq!(health["components"]["model_heart"]["status"], "healthy");
    assert_eq!(health["components"]["credential_store"]["status"], "healthy");

    let (status, readiness) = send(&app.router, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_no_models_is_unhealthy() {
    let dir = TempDir::new().unwrap();
    let context = AppContext::from_parts(
        InferenceAdapter::new(BTreeMap::new(), CategoricalSchema::default()),
        CredentialStore::with_rounds(dir.path().join("users.json"), 1000),
        ReferenceSchemaProvider::new(dir.path()),
    );
    let router = create_router(build_state(context).await);

    let (status, health) = send(&router, get("/healthz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["components"]["predictor"]["status"], "unhealthy");

    let (status, _) = send(&router, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_predict_returns_outcome() {
    let app = setup_test_app().await;

    let (status, body) = send(
        &app.router,
        post(
            "/api/v1/predict/heart",
            json!({"features": {"age": 63, "sex": "1", "cp": 3, "chol": 233}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let label = body["label"].as_u64().unwrap();
    assert!(label <= 1);
    let confidence = body["confidence"].as_f64().unwrap();
    assert!(confidence >= 50.0 && confidence <= 100.0);
    assert!(body["confidence_display"].as_str().unwrap().ends_with('%'));
    let expected = if label == 1 { "Risk Detected" } else { "Appears Healthy" };
    assert_eq!(body["result"], expected);
    assert!(body["model_version"].as_str().unwrap().starts_with('v'));

    let stats = app.state.context.adapter.stats();
    assert_eq!(stats.total_predictions, 1);
}

#[tokio::test]
async fn test_predict_tolerates_partial_and_mistyped_input() {
    let app = setup_test_app().await;

    let (status, _) = send(
        &app.router,
        post(
            "/api/v1/predict/diabetes",
            json!({"features": {"Glucose": "n/a", "Pregnancies": 2}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app.router,
        post("/api/v1/predict/Heart%20Disease", json!({"features": {"cp": 9}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_predict_unknown_or_unloaded_model_is_404() {
    let app = setup_test_app().await;

    let (status, body) = send(
        &app.router,
        post("/api/v1/predict/kidney", json!({"features": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "unknown_model");

    let (status, body) = send(
        &app.router,
        post("/api/v1/predict/parkinson", json!({"features": {"Fo": 119.9}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "model_not_loaded");
}

#[tokio::test]
async fn test_transform_failure_is_422() {
    let dir = TempDir::new().unwrap();
    let names = vec!["Glucose".to_string()];
    let bundle = ModelArtifactBundle::new(
        Disease::Diabetes,
        Box::new(LogisticRegression {
            feature_names: names.clone(),
            coefficients: vec![1.0],
            intercept: 0.0,
        }),
        StandardScaler {
            feature_names: names.clone(),
            mean: vec![120.0],
            scale: vec![0.0],
        },
        MeanImputer {
            feature_names: names,
            statistics: vec![120.0],
        },
        "v-broken",
    )
    .unwrap();
    let context = AppContext::from_parts(
        InferenceAdapter::new(BTreeMap::new(), CategoricalSchema::default()).with_bundle(bundle),
        CredentialStore::with_rounds(dir.path().join("users.json"), 1000),
        ReferenceSchemaProvider::new(dir.path()),
    );
    let router = create_router(build_state(context).await);

    let (status, body) = send(
        &router,
        post("/api/v1/predict/diabetes", json!({"features": {"Glucose": 150}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "transform");
}

#[tokio::test]
async fn test_register_and_login() {
    let app = setup_test_app().await;
    let user = json!({"username": "Alice", "password": "pw123", "email": "alice@example.com"});

    let (status, body) = send(&app.router, post("/api/v1/auth/register", user.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Registration successful! Please login.");

    let (status, body) = send(&app.router, post("/api/v1/auth/register", user)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists");

    let (status, body) = send(
        &app.router,
        post("/api/v1/auth/login", json!({"username": "alice", "password": "pw123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");

    let (status, body) = send(
        &app.router,
        post("/api/v1/auth/login", json!({"username": "alice", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_register_validation_is_400() {
    let app = setup_test_app().await;
    let (status, body) = send(
        &app.router,
        post(
            "/api/v1/auth/register",
            json!({"username": "bob", "password": "pw", "email": "bob-at-example"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email format.");
}

#[tokio::test]
async fn test_models_and_schema() {
    let app = setup_test_app().await;

    let (status, models) = send(&app.router, get("/api/v1/models")).await;
    assert_eq!(status, StatusCode::OK);
    let models = models.as_array().unwrap();
    assert_eq!(models.len(), 3);
    assert_eq!(models[1]["disease"], "heart");
    assert_eq!(models[1]["available"], true);
    assert_eq!(models[2]["available"], false);

    let (status, schema) = send(&app.router, get("/api/v1/models/heart/schema")).await;
    assert_eq!(status, StatusCode::OK);
    let fields = schema["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[1]["name"], "sex");
    assert_eq!(fields[1]["type"], "categorical");

    let (status, _) = send(&app.router, get("/api/v1/models/parkinson/schema")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app.router, get("/api/v1/models/kidney/schema")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_reports_predictions() {
    let app = setup_test_app().await;
    send(
        &app.router,
        post("/api/v1/predict/diabetes", json!({"features": {"Glucose": 180, "BMI": 33}})),
    )
    .await;

    let response = app.router.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("mediscan_prediction_latency_seconds"));
    assert!(text.contains("mediscan_predictions_total"));
    assert!(text.contains("mediscan_models_loaded"));
}

/// `disease` label values recorded on the prediction error counter
fn prediction_error_diseases() -> Vec<String> {
    prometheus::gather()
        .iter()
        .filter(|family| family.get_name() == "mediscan_prediction_errors_total")
        .flat_map(|family| family.get_metric().iter())
        .flat_map(|metric| metric.get_label().iter())
        .filter(|label| label.get_name() == "disease")
        .map(|label| label.get_value().to_string())
        .collect()
}

#[tokio::test]
async fn test_unknown_model_keys_share_one_error_series() {
    let app = setup_test_app().await;

    for key in ["junk-one", "junk-two", "Kidney%20Disease"] {
        let (status, body) = send(
            &app.router,
            post(&format!("/api/v1/predict/{}", key), json!({"features": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "unknown_model");
    }

    let diseases = prediction_error_diseases();
    assert!(diseases.iter().any(|d| d == UNKNOWN_MODEL_LABEL));
    for d in &diseases {
        assert!(
            d == UNKNOWN_MODEL_LABEL || d.parse::<Disease>().is_ok(),
            "unexpected disease label {}",
            d
        );
    }
}

#[tokio::test]
async fn test_credential_store_recovers_after_storage_failure() {
    let app = setup_test_app().await;
    let users_file = app.state.context.credentials.path().to_path_buf();
    std::fs::write(&users_file, "{ broken").unwrap();

    let user = json!({"username": "frank", "password": "pw"});
    let (status, _) = send(&app.router, post("/api/v1/auth/register", user.clone())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (_, health) = send(&app.router, get("/healthz")).await;
    assert_eq!(health["components"]["credential_store"]["status"], "degraded");

    std::fs::remove_file(&users_file).unwrap();
    let (status, _) = send(&app.router, post("/api/v1/auth/register", user)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, health) = send(&app.router, get("/healthz")).await;
    assert_eq!(health["components"]["credential_store"]["status"], "healthy");
}
