//! Model artifact bundles and their storage
//!
//! A bundle is the fitted imputer, scaler and classifier for one disease
//! together with the feature schema they were trained on. Bundles are
//! loaded once and shared read-only for the lifetime of the process.

mod file;

pub use file::{artifact_file_names, compute_checksum, FileArtifactStore, UNVERSIONED};

use crate::error::ArtifactLoadError;
use crate::models::Disease;
use crate::predictor::{Classifier, MeanImputer, StandardScaler};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Metadata written next to the artifact files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub disease: Disease,
    pub version: String,
    pub trained_at: i64,
    pub training_rows: usize,
    pub training_accuracy: f64,
    pub features: FeatureSchema,
    /// SHA-256 hex digest per artifact file name
    pub checksums: BTreeMap<String, String>,
}

/// Fitted model, scaler and imputer for one disease
#[derive(Debug)]
pub struct ModelArtifactBundle {
    disease: Disease,
    model: Box<dyn Classifier>,
    scaler: StandardScaler,
    imputer: MeanImputer,
    expected_features: FeatureSchema,
    version: String,
}

impl ModelArtifactBundle {
    /// Assemble a bundle, checking that all three artifacts agree on columns
    ///
    /// The imputer's column list is the authoritative training schema.
    pub fn new(
        disease: Disease,
        model: Box<dyn Classifier>,
        scaler: StandardScaler,
        imputer: MeanImputer,
        version: impl Into<String>,
    ) -> Result<Self, ArtifactLoadError> {
        if imputer.feature_names.len() != imputer.statistics.len() {
            return Err(ArtifactLoadError::Inconsistent(format!(
                "imputer has {} names but {} statistics",
                imputer.feature_names.len(),
                imputer.statistics.len()
            )));
        }
        if scaler.mean.len() != scaler.scale.len() {
            return Err(ArtifactLoadError::Inconsistent(format!(
                "scaler has {} means but {} scales",
                scaler.mean.len(),
                scaler.scale.len()
            )));
        }
        if scaler.feature_names != imputer.feature_names {
            return Err(ArtifactLoadError::Inconsistent(
                "scaler and imputer were fitted on different columns".to_string(),
            ));
        }
        if model.feature_names() != imputer.feature_names.as_slice() {
            return Err(ArtifactLoadError::Inconsistent(
                "model and imputer were fitted on different columns".to_string(),
            ));
        }

        let expected_features =
            FeatureSchema::from_names(&imputer.feature_names, disease.categorical_columns());

        Ok(Self {
            disease,
            model,
            scaler,
            imputer,
            expected_features,
            version: version.into(),
        })
    }

    pub fn disease(&self) -> Disease {
        self.disease
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn imputer(&self) -> &MeanImputer {
        &self.imputer
    }

    pub fn expected_features(&self) -> &FeatureSchema {
        &self.expected_features
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Source of model bundles
pub trait ArtifactStore: Send + Sync {
    fn load(&self, disease: Disease) -> Result<ModelArtifactBundle, ArtifactLoadError>;
}

/// Outcome of loading every disease at startup
#[derive(Debug, Default)]
pub struct LoadedArtifacts {
    pub bundles: BTreeMap<Disease, Arc<ModelArtifactBundle>>,
    pub failures: BTreeMap<Disease, ArtifactLoadError>,
}

/// Load every disease, keeping failures per disease
///
/// A failed disease is reported once here and is then unavailable; the
/// others still load.
pub fn load_all(store: &dyn ArtifactStore) -> LoadedArtifacts {
    let mut loaded = LoadedArtifacts::default();
    for disease in Disease::ALL {
        match store.load(disease) {
            Ok(bundle) => {
                info!(
                    disease = %disease,
                    version = %bundle.version(),
                    features = bundle.expected_features().len(),
                    "Model artifacts loaded"
                );
                loaded.bundles.insert(disease, Arc::new(bundle));
            }
            Err(e) => {
                warn!(
                    disease = %disease,
                    error = %e,
                    "Failed to load model artifacts, disabling model"
                );
                loaded.failures.insert(disease, e);
            }
        }
    }
    loaded
}
