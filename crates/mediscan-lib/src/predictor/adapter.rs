//! Feature alignment and inference adapter
//!
//! Owns the loaded bundles and turns a raw record into a prediction:
//! align → impute → scale → classify. Every failure comes back as a
//! PredictionError; bundles are never mutated.

use super::features::{align_features, AlignedFeatureVector, CategoricalSchema};
use super::output::OutputFormatter;
use crate::artifacts::{LoadedArtifacts, ModelArtifactBundle};
use crate::error::PredictionError;
use crate::models::{Disease, PredictionOutcome, RawInputRecord};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
pub const MAX_INFERENCE_MS: u128 = 5;

/// Inference statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceStats {
    pub total_predictions: u64,
    pub failed_predictions: u64,
    pub slow_predictions: u64,
}

/// Adapter between raw form input and the loaded model bundles
#[derive(Debug)]
pub struct InferenceAdapter {
    bundles: BTreeMap<Disease, Arc<ModelArtifactBundle>>,
    categorical: CategoricalSchema,
    output_formatter: OutputFormatter,
    prediction_count: AtomicU64,
    failure_count: AtomicU64,
    slow_count: AtomicU64,
}

impl InferenceAdapter {
    pub fn new(
        bundles: BTreeMap<Disease, Arc<ModelArtifactBundle>>,
        categorical: CategoricalSchema,
    ) -> Self {
        Self {
            bundles,
            categorical,
            output_formatter: OutputFormatter::new(),
            prediction_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            slow_count: AtomicU64::new(0),
        }
    }

    /// Adapter over everything that loaded at startup
    pub fn from_loaded(loaded: &LoadedArtifacts) -> Self {
        Self::new(loaded.bundles.clone(), CategoricalSchema::default())
    }

    pub fn with_bundle(mut self, bundle: ModelArtifactBundle) -> Self {
        self.bundles.insert(bundle.disease(), Arc::new(bundle));
        self
    }

    pub fn with_output_formatter(mut self, formatter: OutputFormatter) -> Self {
        self.output_formatter = formatter;
        self
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn bundle(&self, disease: Disease) -> Option<&Arc<ModelArtifactBundle>> {
        self.bundles.get(&disease)
    }

    pub fn is_available(&self, disease: Disease) -> bool {
        self.bundles.contains_key(&disease)
    }

    pub fn available(&self) -> Vec<Disease> {
        self.bundles.keys().copied().collect()
    }

    /// Predict for a model key such as `heart` or `Parkinson's`
    pub fn predict(
        &self,
        model_key: &str,
        raw: &RawInputRecord,
    ) -> Result<PredictionOutcome, PredictionError> {
        let disease: Disease = model_key
            .parse()
            .map_err(|_| PredictionError::UnknownModel(model_key.to_string()))?;
        self.predict_disease(disease, raw)
    }

    pub fn predict_disease(
        &self,
        disease: Disease,
        raw: &RawInputRecord,
    ) -> Result<PredictionOutcome, PredictionError> {
        let start = Instant::now();
        let result = self.run(disease, raw);
        let elapsed = start.elapsed();

        self.prediction_count.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                disease = %disease,
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(disease = %disease, elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        result
    }

    /// Aligned (pre-imputation) row for a record, for inspection
    ///
    /// Always as wide as the bundle's schema: absent columns are zero-filled
    /// and unknown ones dropped, so a column mismatch never fails a request.
    pub fn align(
        &self,
        disease: Disease,
        raw: &RawInputRecord,
    ) -> Result<AlignedFeatureVector, PredictionError> {
        let bundle = self.loaded_bundle(disease)?;
        let expected = bundle.expected_features();
        if expected.is_empty() {
            return Err(PredictionError::EmptySchema(disease.key().to_string()));
        }
        let categorical = self.categorical.columns_for(disease);
        Ok(align_features(raw, &categorical, expected))
    }

    fn run(
        &self,
        disease: Disease,
        raw: &RawInputRecord,
    ) -> Result<PredictionOutcome, PredictionError> {
        let aligned = self.align(disease, raw)?;
        let bundle = self.loaded_bundle(disease)?;

        let imputed = bundle.imputer().transform(aligned.values())?;
        let scaled = bundle.scaler().transform(&imputed)?;

        let model = bundle.model();
        let label = model.predict(&scaled)?;
        let probabilities = model.predict_proba(&scaled)?;

        Ok(self
            .output_formatter
            .format(disease, label, probabilities, bundle.version()))
    }

    fn loaded_bundle(
        &self,
        disease: Disease,
    ) -> Result<&Arc<ModelArtifactBundle>, PredictionError> {
        self.bundles
            .get(&disease)
            .ok_or_else(|| PredictionError::ModelNotLoaded(disease.key().to_string()))
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_predictions: self.prediction_count.load(Ordering::Relaxed),
            failed_predictions: self.failure_count.load(Ordering::Relaxed),
            slow_predictions: self.slow_count.load(Ordering::Relaxed),
        }
    }
}
