//! Application context
//!
//! Everything a request handler needs, constructed once at startup and
//! passed explicitly. Bundles inside the adapter are read-only.

use crate::artifacts::{load_all, ArtifactStore, FileArtifactStore};
use crate::credentials::{CredentialStore, DEFAULT_ROUNDS};
use crate::models::Disease;
use crate::predictor::InferenceAdapter;
use crate::reference::ReferenceSchemaProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Locations and parameters the context is built from
#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub models_dir: PathBuf,
    pub data_dir: PathBuf,
    pub users_file: PathBuf,
    pub password_rounds: u32,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            data_dir: PathBuf::from("data"),
            users_file: PathBuf::from("users.json"),
            password_rounds: DEFAULT_ROUNDS,
        }
    }
}

/// Availability of one disease model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub disease: Disease,
    pub display_name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct AppContext {
    pub adapter: InferenceAdapter,
    pub credentials: CredentialStore,
    pub reference: ReferenceSchemaProvider,
    load_failures: BTreeMap<Disease, String>,
}

impl AppContext {
    /// Load every model from the configured directory
    pub fn load(settings: &ContextSettings) -> Self {
        Self::load_from(&FileArtifactStore::new(&settings.models_dir), settings)
    }

    pub fn load_from(store: &dyn ArtifactStore, settings: &ContextSettings) -> Self {
        let loaded = load_all(store);
        let load_failures = loaded
            .failures
            .iter()
            .map(|(disease, e)| (*disease, e.to_string()))
            .collect();
        Self {
            adapter: InferenceAdapter::from_loaded(&loaded),
            credentials: CredentialStore::with_rounds(
                &settings.users_file,
                settings.password_rounds,
            ),
            reference: ReferenceSchemaProvider::new(&settings.data_dir),
            load_failures,
        }
    }

    pub fn from_parts(
        adapter: InferenceAdapter,
        credentials: CredentialStore,
        reference: ReferenceSchemaProvider,
    ) -> Self {
        let load_failures = Disease::ALL
            .iter()
            .filter(|d| !adapter.is_available(**d))
            .map(|d| (*d, "model not loaded".to_string()))
            .collect();
        Self {
            adapter,
            credentials,
            reference,
            load_failures,
        }
    }

    /// Why a disease model is unavailable, if it is
    pub fn load_failure(&self, disease: Disease) -> Option<&str> {
        self.load_failures.get(&disease).map(String::as_str)
    }

    pub fn models_loaded(&self) -> usize {
        self.adapter.available().len()
    }

    pub fn model_statuses(&self) -> Vec<ModelStatus> {
        Disease::ALL
            .iter()
            .map(|disease| {
                let bundle = self.adapter.bundle(*disease);
                ModelStatus {
                    disease: *disease,
                    display_name: disease.display_name().to_string(),
                    available: bundle.is_some(),
                    version: bundle.map(|b| b.version().to_string()),
                    features: bundle.map(|b| b.expected_features().len()),
                    error: self.load_failure(*disease).map(String::from),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ModelArtifactBundle;
    use crate::error::ArtifactLoadError;
    use crate::predictor::{LogisticRegression, MeanImputer, StandardScaler};
    use tempfile::TempDir;

    struct DiabetesOnly;

    impl ArtifactStore for DiabetesOnly {
        fn load(&self, disease: Disease) -> Result<ModelArtifactBundle, ArtifactLoadError> {
            if disease != Disease::Diabetes {
                return Err(ArtifactLoadError::Missing(PathBuf::from(disease.key())));
            }
            let names = vec!["Glucose".to_string()];
            ModelArtifactBundle::new(
                disease,
                Box::new(LogisticRegression {
                    feature_names: names.clone(),
                    coefficients: vec![1.0],
                    intercept: 0.0,
                }),
                StandardScaler {
                    feature_names: names.clone(),
                    mean: vec![120.0],
                    scale: vec![30.0],
                },
                MeanImputer {
                    feature_names: names,
                    statistics: vec![120.0],
                },
                "v1",
            )
        }
    }

    #[test]
    fn test_partial_load_keeps_serving() {
        let dir = TempDir::new().unwrap();
        let settings = ContextSettings {
            users_file: dir.path().join("users.json"),
            ..ContextSettings::default()
        };
        let context = AppContext::load_from(&DiabetesOnly, &settings);

        assert_eq!(context.models_loaded(), 1);
        assert!(context.load_failure(Disease::Diabetes).is_none());
        assert!(context.load_failure(Disease::Heart).unwrap().contains("not found"));

        let statuses = context.model_statuses();
        assert_eq!(statuses.len(), 3);
        assert!(statuses[0].available);
        assert_eq!(statuses[0].version.as_deref(), Some("v1"));
        assert!(!statuses[1].available);
    }
}
