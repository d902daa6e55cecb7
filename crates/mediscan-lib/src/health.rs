//! Health checks for the prediction service
//!
//! Each model and the credential store is tracked as a component. A model
//! that failed to load is degraded, not fatal: the service keeps serving the
//! others. Readiness requires startup to have finished and at least one
//! model to be usable.

use crate::models::Disease;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Operational with reduced capability
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn at(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::at(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::at(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::at(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .fold(ComponentStatus::Healthy, |worst, status| match (worst, status) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            })
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    use crate::models::Disease;

    pub const PREDICTOR: &str = "predictor";
    pub const CREDENTIAL_STORE: &str = "credential_store";

    /// Component name for one disease model, e.g. `model_heart`
    pub fn model_component(disease: Disease) -> String {
        format!("model_{}", disease.key())
    }
}

/// Shared registry of component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Record the startup load result for one model
    pub async fn record_model(&self, disease: Disease, failure: Option<&str>) {
        let name = components::model_component(disease);
        match failure {
            None => self.set_healthy(&name).await,
            Some(reason) => {
                self.set_degraded(&name, format!("model unavailable: {}", reason))
                    .await
            }
        }
    }

    /// Predictor is unhealthy when no model at all could be loaded
    pub async fn record_predictor(&self, loaded_models: usize) {
        if loaded_models == 0 {
            self.set_unhealthy(components::PREDICTOR, "no models loaded")
                .await;
        } else {
            self.set_healthy(components::PREDICTOR).await;
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        let reason = if !ready {
            Some("Service not yet initialized".to_string())
        } else if health.status == ComponentStatus::Unhealthy {
            let failed: Vec<&str> = health
                .components
                .iter()
                .filter(|(_, h)| h.status == ComponentStatus::Unhealthy)
                .map(|(name, _)| name.as_str())
                .collect();
            Some(format!("Unhealthy components: {}", failed.join(", ")))
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy_but_not_ready() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_failed_model_degrades_service() {
        let registry = HealthRegistry::new();
        registry.record_model(Disease::Diabetes, None).await;
        registry
            .record_model(Disease::Parkinson, Some("artifact file missing"))
            .await;
        registry.record_predictor(1).await;
        registry.set_ready(true).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        let parkinson = &health.components["model_parkinson"];
        assert_eq!(parkinson.status, ComponentStatus::Degraded);
        assert!(parkinson.message.as_deref().unwrap().contains("missing"));

        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_no_models_is_not_ready() {
        let registry = HealthRegistry::new();
        registry.register(components::CREDENTIAL_STORE).await;
        registry.record_predictor(0).await;
        registry.set_ready(true).await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Unhealthy components: predictor")
        );
    }

    #[tokio::test]
    async fn test_component_recovers() {
        let registry = HealthRegistry::new();
        registry
            .set_unhealthy(components::CREDENTIAL_STORE, "users file unreadable")
            .await;
        registry.set_healthy(components::CREDENTIAL_STORE).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[test]
    fn test_model_component_names() {
        assert_eq!(components::model_component(Disease::Heart), "model_heart");
        assert!(ComponentStatus::Degraded.is_operational());
        assert!(!ComponentStatus::Unhealthy.is_operational());
    }
}
