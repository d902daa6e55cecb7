//! JSON file artifact store
//!
//! Layout under the models directory, one set per disease:
//! `<key>_model.json`, `<key>_scaler.json`, `<key>_imputer.json` and
//! `<key>_manifest.json`. The manifest carries SHA-256 checksums that are
//! validated on every load.

use super::{ArtifactManifest, ArtifactStore, ModelArtifactBundle};
use crate::error::ArtifactLoadError;
use crate::models::Disease;
use crate::predictor::{LogisticRegression, MeanImputer, StandardScaler};
use crate::training::TrainedModel;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Version reported for bundles stored without a manifest
pub const UNVERSIONED: &str = "unversioned";

/// File names as (model, scaler, imputer, manifest)
pub fn artifact_file_names(disease: Disease) -> (String, String, String, String) {
    let key = disease.key();
    (
        format!("{}_model.json", key),
        format!("{}_scaler.json", key),
        format!("{}_imputer.json", key),
        format!("{}_manifest.json", key),
    )
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Artifact store backed by a directory of JSON files
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    models_dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Persist a trained model and return the manifest written for it
    pub fn save(&self, trained: &TrainedModel) -> Result<ArtifactManifest> {
        fs::create_dir_all(&self.models_dir).with_context(|| {
            format!("Failed to create models directory {:?}", self.models_dir)
        })?;

        let (model_file, scaler_file, imputer_file, manifest_file) =
            artifact_file_names(trained.disease);

        let mut checksums = BTreeMap::new();
        for (name, bytes) in [
            (&model_file, to_json(&trained.model)?),
            (&scaler_file, to_json(&trained.scaler)?),
            (&imputer_file, to_json(&trained.imputer)?),
        ] {
            let path = self.models_dir.join(name);
            fs::write(&path, &bytes).with_context(|| format!("Failed to write {:?}", path))?;
            checksums.insert(name.clone(), compute_checksum(&bytes));
        }

        let model_digest = checksums.get(&model_file).map(String::as_str).unwrap_or_default();
        let trained_at = chrono::DateTime::from_timestamp(trained.trained_at, 0)
            .unwrap_or_else(chrono::Utc::now);
        let version = format!(
            "v{}-{}",
            trained_at.format("%Y%m%d%H%M%S"),
            &model_digest[..model_digest.len().min(8)]
        );

        let manifest = ArtifactManifest {
            disease: trained.disease,
            version,
            trained_at: trained.trained_at,
            training_rows: trained.training_rows,
            training_accuracy: trained.training_accuracy,
            features: trained.features.clone(),
            checksums,
        };
        let path = self.models_dir.join(&manifest_file);
        fs::write(&path, to_json(&manifest)?)
            .with_context(|| format!("Failed to write {:?}", path))?;

        info!(
            disease = %trained.disease,
            version = %manifest.version,
            dir = %self.models_dir.display(),
            "Model artifacts saved"
        );
        Ok(manifest)
    }

    /// Read the manifest for a disease, if one was written
    pub fn manifest(
        &self,
        disease: Disease,
    ) -> Result<Option<ArtifactManifest>, ArtifactLoadError> {
        let (_, _, _, manifest_file) = artifact_file_names(disease);
        let path = self.models_dir.join(manifest_file);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = read_file(&path)?;
        parse(&path, &bytes).map(Some)
    }
}

impl ArtifactStore for FileArtifactStore {
    fn load(&self, disease: Disease) -> Result<ModelArtifactBundle, ArtifactLoadError> {
        let (model_file, scaler_file, imputer_file, _) = artifact_file_names(disease);
        let manifest = self.manifest(disease)?;
        if manifest.is_none() {
            warn!(disease = %disease, "No manifest found, skipping checksum validation");
        }

        let read_verified = |name: &str| -> Result<(PathBuf, Vec<u8>), ArtifactLoadError> {
            let path = self.models_dir.join(name);
            let bytes = read_file(&path)?;
            if let Some(expected) = manifest.as_ref().and_then(|m| m.checksums.get(name)) {
                let actual = compute_checksum(&bytes);
                if &actual != expected {
                    return Err(ArtifactLoadError::ChecksumMismatch {
                        path,
                        expected: expected.clone(),
                        actual,
                    });
                }
                debug!(file = %name, checksum = %actual, "Artifact checksum validated");
            }
            Ok((path, bytes))
        };

        let (model_path, model_bytes) = read_verified(&model_file)?;
        let (scaler_path, scaler_bytes) = read_verified(&scaler_file)?;
        let (imputer_path, imputer_bytes) = read_verified(&imputer_file)?;

        let model: LogisticRegression = parse(&model_path, &model_bytes)?;
        let scaler: StandardScaler = parse(&scaler_path, &scaler_bytes)?;
        let imputer: MeanImputer = parse(&imputer_path, &imputer_bytes)?;

        if let Some(m) = &manifest {
            if !m.features.matches_names(&imputer.feature_names) {
                return Err(ArtifactLoadError::Inconsistent(
                    "manifest feature schema does not match the imputer".to_string(),
                ));
            }
        }

        let version = manifest
            .map(|m| m.version)
            .unwrap_or_else(|| UNVERSIONED.to_string());
        ModelArtifactBundle::new(disease, Box::new(model), scaler, imputer, version)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).context("Failed to serialize artifact")
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactLoadError> {
    if !path.exists() {
        return Err(ArtifactLoadError::Missing(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| ArtifactLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ArtifactLoadError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
