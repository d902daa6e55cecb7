//! ML prediction engine

mod adapter;
mod features;
mod inference;
mod output;
mod transform;


pub use adapter::{InferenceAdapter, InferenceStats, MAX_INFERENCE_MS};
pub use features::{align_features, encode_categoricals, AlignedFeatureVector, CategoricalSchema};
pub use inference::{FitConfig, LogisticRegression};
pub use output::{OutputConfig, OutputFormatter, LOW_CONFIDENCE_PERCENT};
pub use transform::{MeanImputer, StandardScaler};

use crate::error::TransformError;

/// Trait for fitted binary classifiers
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Predicted class (0 or 1) for one standardized row
    fn predict(&self, features: &[f64]) -> Result<u8, TransformError>;

    /// Class probabilities `[P(0), P(1)]` for one standardized row
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], TransformError>;

    /// Column names the classifier was fitted on
    fn feature_names(&self) -> &[String];

    fn n_features(&self) -> usize {
        self.feature_names().len()
    }
}
