//! Model training pipeline
//!
//! Fits the imputer, scaler and logistic regression for a disease from its
//! CSV dataset. Categorical columns are one-hot encoded with the first
//! (sorted) category dropped, and rows are encoded with the same functions
//! the inference path uses.

use crate::artifacts::{ArtifactManifest, FileArtifactStore, ModelArtifactBundle};
use crate::dataset::Dataset;
use crate::error::{ArtifactLoadError, DatasetError, TrainingError};
use crate::models::{Disease, RawValue};
use crate::predictor::{
    encode_categoricals, FitConfig, LogisticRegression, MeanImputer, StandardScaler,
};
use crate::schema::{FeatureColumn, FeatureSchema};
use ndarray::{Array1, Array2};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Fitted artifacts for one disease, ready to be saved
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub disease: Disease,
    pub imputer: MeanImputer,
    pub scaler: StandardScaler,
    pub model: LogisticRegression,
    pub features: FeatureSchema,
    pub training_rows: usize,
    pub training_accuracy: f64,
    pub trained_at: i64,
}

impl TrainedModel {
    /// Use the fitted artifacts directly, without a round trip through storage
    pub fn into_bundle(self, version: &str) -> Result<ModelArtifactBundle, ArtifactLoadError> {
        ModelArtifactBundle::new(
            self.disease,
            Box::new(self.model),
            self.scaler,
            self.imputer,
            version,
        )
    }
}

/// Build the training-time schema for a dataset
///
/// Numeric columns keep dataset order; indicator columns follow, grouped
/// per categorical column, skipping each column's first sorted category.
pub fn build_schema(
    dataset: &Dataset,
    feature_columns: &[&str],
    categorical: &[&str],
) -> Result<FeatureSchema, DatasetError> {
    let mut columns: Vec<FeatureColumn> = feature_columns
        .iter()
        .filter(|name| !categorical.contains(name))
        .map(|name| FeatureColumn::numeric(*name))
        .collect();

    for source in categorical {
        let categories: BTreeSet<String> = dataset
            .column(source)?
            .into_iter()
            .filter_map(RawValue::category_label)
            .collect();
        columns.extend(
            categories
                .iter()
                .skip(1)
                .map(|category| FeatureColumn::indicator(source, category)),
        );
    }

    Ok(FeatureSchema::new(columns))
}

/// Fit all artifacts for `disease` on `dataset`
pub fn train(
    disease: Disease,
    dataset: &Dataset,
    config: &FitConfig,
) -> Result<TrainedModel, TrainingError> {
    let target = disease.target_column();
    let target_idx = dataset
        .column_index(target)
        .ok_or_else(|| DatasetError::MissingColumn(target.to_string()))?;

    let mut y = Vec::with_capacity(dataset.len());
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        match row.get(target_idx).and_then(RawValue::as_f64) {
            Some(v) if v == 0.0 || v == 1.0 => y.push(v),
            _ => {
                return Err(TrainingError::NonBinaryTarget {
                    column: target.to_string(),
                    row: row_idx,
                })
            }
        }
    }
    if y.iter().all(|v| *v == y[0]) {
        return Err(TrainingError::SingleClass(target.to_string()));
    }

    let feature_columns: Vec<&str> = dataset
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| *c != target && !disease.drop_columns().contains(c))
        .collect();
    if feature_columns.is_empty() {
        return Err(TrainingError::NoFeatures);
    }
    let categorical: Vec<&str> = disease
        .categorical_columns()
        .iter()
        .copied()
        .filter(|c| feature_columns.contains(c))
        .collect();

    let schema = build_schema(dataset, &feature_columns, &categorical)?;
    let names = schema.names();

    let rows: Vec<Vec<Option<f64>>> = (0..dataset.len())
        .map(|row_idx| {
            let record = dataset.record(row_idx, &feature_columns);
            let encoded = encode_categoricals(&record, &categorical);
            schema.reindex(&encoded).iter().map(RawValue::as_f64).collect()
        })
        .collect();

    let imputer = MeanImputer::fit(names.clone(), &rows)?;
    let mut flat = Vec::with_capacity(rows.len() * names.len());
    for row in &rows {
        flat.extend(imputer.transform(row)?);
    }
    let x = Array2::from_shape_vec((rows.len(), names.len()), flat)
        .map_err(|_| TrainingError::NoFeatures)?;

    let scaler = StandardScaler::fit(names.clone(), &x)?;
    let x_scaled = scaler.transform_matrix(&x)?;
    let y = Array1::from(y);

    let model = LogisticRegression::fit(names, &x_scaled, &y, config)?;
    let training_accuracy = model.accuracy(&x_scaled, &y)?;

    info!(
        disease = %disease,
        rows = dataset.len(),
        features = schema.len(),
        accuracy = training_accuracy,
        "Model trained"
    );

    Ok(TrainedModel {
        disease,
        imputer,
        scaler,
        model,
        features: schema,
        training_rows: dataset.len(),
        training_accuracy,
        trained_at: chrono::Utc::now().timestamp(),
    })
}

/// Per-disease result of a training run
#[derive(Debug)]
pub struct TrainingRun {
    pub disease: Disease,
    pub result: anyhow::Result<ArtifactManifest>,
}

/// Train each disease from `<data_dir>/<file>` and save through `store`
///
/// One disease failing does not stop the others.
pub fn train_and_save(
    data_dir: &Path,
    store: &FileArtifactStore,
    diseases: &[Disease],
    config: &FitConfig,
) -> Vec<TrainingRun> {
    diseases
        .iter()
        .map(|disease| {
            let path = data_dir.join(disease.data_file());
            info!(disease = %disease, path = %path.display(), "Training model");
            let result = Dataset::from_path(&path)
                .map_err(TrainingError::from)
                .and_then(|dataset| train(*disease, &dataset, config))
                .map_err(anyhow::Error::from)
                .and_then(|trained| store.save(&trained));
            if let Err(e) = &result {
                warn!(disease = %disease, error = %e, "Training failed");
            }
            TrainingRun {
                disease: *disease,
                result,
            }
        })
        .collect()
}
