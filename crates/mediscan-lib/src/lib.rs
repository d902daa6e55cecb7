//! Core library for disease-risk prediction
//!
//! This crate provides the core functionality for:
//! - Aligning submitted form values to a model's training schema
//! - Imputation, scaling and logistic-regression inference
//! - Loading and saving checksummed model artifacts
//! - Training models from CSV datasets
//! - Reference input forms and the credential store
//! - Health checks and observability

pub mod artifacts;
pub mod context;
pub mod credentials;
pub mod dataset;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod reference;
pub mod schema;
pub mod training;

pub use context::{AppContext, ContextSettings, ModelStatus};
pub use error::{ArtifactLoadError, CredentialError, PredictionError, TransformError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AppMetrics, StructuredLogger};
pub use predictor::{align_features, InferenceAdapter};
