//! Error types shared across the prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Stage of the inference pipeline that rejected a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStage {
    Imputer,
    Scaler,
    Model,
}

impl std::fmt::Display for TransformStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransformStage::Imputer => "imputer",
            TransformStage::Scaler => "scaler",
            TransformStage::Model => "model",
        };
        f.write_str(name)
    }
}

/// A fitted transform or the classifier refused its input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("{stage} expected {expected} features, got {actual}")]
    WidthMismatch {
        stage: TransformStage,
        expected: usize,
        actual: usize,
    },
    #[error("{stage} produced a non-finite value for feature '{feature}'")]
    NonFinite {
        stage: TransformStage,
        feature: String,
    },
}

impl TransformError {
    pub fn stage(&self) -> TransformStage {
        match self {
            TransformError::WidthMismatch { stage, .. }
            | TransformError::NonFinite { stage, .. } => *stage,
        }
    }
}

/// Failure of a single prediction request
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("unknown model key: {0}")]
    UnknownModel(String),
    #[error("model key not found in loaded artifacts: {0}")]
    ModelNotLoaded(String),
    #[error("required feature schema empty or unset for model {0}")]
    EmptySchema(String),
    #[error("prediction failed: {0}")]
    Transform(#[from] TransformError),
}

impl PredictionError {
    /// Short tag for metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::UnknownModel(_) => "unknown_model",
            PredictionError::ModelNotLoaded(_) => "model_not_loaded",
            PredictionError::EmptySchema(_) => "empty_schema",
            PredictionError::Transform(_) => "transform",
        }
    }
}

/// A model bundle could not be read from storage
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("artifact file {0} not found")]
    Missing(PathBuf),
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("inconsistent artifacts: {0}")]
    Inconsistent(String),
}

/// Credential store failures; `Display` is the user-facing message
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Username and password cannot be empty.")]
    EmptyCredentials,
    #[error("Invalid email format.")]
    InvalidEmail,
    #[error("User already exists")]
    UserExists,
    #[error("User does not exist or incorrect password")]
    InvalidCredentials,
    #[error("User data incomplete.")]
    IncompleteRecord,
    #[error("credential store unavailable: {0}")]
    Storage(String),
}

impl CredentialError {
    /// Storage failures are operational, everything else is a user error
    pub fn is_user_error(&self) -> bool {
        !matches!(self, CredentialError::Storage(_))
    }
}

/// Dataset loading failure
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset {0} not found")]
    NotFound(PathBuf),
    #[error("failed to read dataset {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("dataset {0} has no rows")]
    Empty(PathBuf),
    #[error("column '{0}' not found in dataset")]
    MissingColumn(String),
}

/// Model fitting failure
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("target column '{column}' has non-binary value at row {row}")]
    NonBinaryTarget { column: String, row: usize },
    #[error("target column '{0}' contains a single class")]
    SingleClass(String),
    #[error("no feature columns left after preprocessing")]
    NoFeatures,
    #[error(transparent)]
    Transform(#[from] TransformError),
}
