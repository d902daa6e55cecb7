//! Feature alignment for ML inference
//!
//! Reshapes a submitted record into the exact column layout a model was
//! trained on: categorical columns are one-hot encoded, the encoded row is
//! reindexed against the training schema, and every cell is coerced to a
//! number. Nothing here touches a fitted model, so alignment can be tested
//! on its own.

use crate::models::{Disease, RawInputRecord, RawValue};
use crate::schema::{indicator_name, EncodedRow, FeatureSchema};
use std::collections::BTreeMap;
use tracing::debug;

/// Row aligned to a training schema, before imputation
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFeatureVector {
    names: Vec<String>,
    values: Vec<Option<f64>>,
}

impl AlignedFeatureVector {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Numeric cells in schema order; `None` marks a missing value
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    pub fn get(&self, name: &str) -> Option<Option<f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }
}

/// Per-model set of columns that are one-hot encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalSchema {
    columns: BTreeMap<Disease, Vec<String>>,
}

impl CategoricalSchema {
    pub fn empty() -> Self {
        Self {
            columns: BTreeMap::new(),
        }
    }

    pub fn with_columns(mut self, disease: Disease, columns: &[&str]) -> Self {
        self.columns
            .insert(disease, columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Categorical columns for a model; empty when none are configured
    pub fn columns_for(&self, disease: Disease) -> Vec<&str> {
        self.columns
            .get(&disease)
            .map(|cols| cols.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl Default for CategoricalSchema {
    fn default() -> Self {
        Disease::ALL
            .iter()
            .fold(Self::empty(), |schema, disease| {
                schema.with_columns(*disease, disease.categorical_columns())
            })
    }
}

/// One-hot encode the categorical columns present in `raw`
///
/// Each present categorical column is replaced by a single indicator
/// `<column>_<category>` set to 1. Categories are canonicalized first so
/// the input's type does not change the column name. Which indicators the
/// model actually knows is decided later by the schema reindex.
pub fn encode_categoricals(raw: &RawInputRecord, categorical: &[&str]) -> EncodedRow {
    let mut row = EncodedRow::new();
    for (name, value) in raw {
        if categorical.contains(&name.as_str()) {
            if let Some(category) = value.category_label() {
                row.insert(indicator_name(name, &category), RawValue::Number(1.0));
            }
        } else {
            row.insert(name.clone(), value.clone());
        }
    }
    row
}

/// Align a raw record to the training schema
///
/// The result always has exactly `expected.len()` values in schema order.
pub fn align_features(
    raw: &RawInputRecord,
    categorical: &[&str],
    expected: &FeatureSchema,
) -> AlignedFeatureVector {
    let encoded = encode_categoricals(raw, categorical);

    let dropped: Vec<&str> = encoded
        .keys()
        .filter(|name| expected.position(name).is_none())
        .map(String::as_str)
        .collect();
    let filled = expected
        .columns()
        .iter()
        .filter(|c| !encoded.contains_key(&c.name))
        .count();
    if !dropped.is_empty() || filled > 0 {
        debug!(dropped = ?dropped, filled, "Reindexed input against training schema");
    }

    let values = expected
        .reindex(&encoded)
        .iter()
        .map(RawValue::as_f64)
        .collect();

    AlignedFeatureVector {
        names: expected.names(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureColumn;

    fn record(entries: &[(&str, RawValue)]) -> RawInputRecord {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn heart_schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            FeatureColumn::numeric("age"),
            FeatureColumn::numeric("chol"),
            FeatureColumn::indicator("sex", "1"),
            FeatureColumn::indicator("cp", "1"),
            FeatureColumn::indicator("cp", "2"),
            FeatureColumn::indicator("cp", "3"),
        ])
    }

    #[test]
    fn test_numeric_only_alignment_keeps_schema_order() {
        let schema = FeatureSchema::from_names(&["age", "bmi", "glucose"], &[]);
        let raw = record(&[
            ("glucose", 130.0.into()),
            ("age", 45.0.into()),
            ("bmi", 28.4.into()),
        ]);
        let aligned = align_features(&raw, &[], &schema);
        assert_eq!(aligned.values(), &[Some(45.0), Some(28.4), Some(130.0)]);
        assert_eq!(aligned.names(), &["age", "bmi", "glucose"]);
    }

    #[test]
    fn test_categorical_type_does_not_matter() {
        let schema = heart_schema();
        let as_text = record(&[("age", 50.0.into()), ("sex", "1".into())]);
        let as_int = record(&[("age", 50.0.into()), ("sex", 1i64.into())]);
        let a = align_features(&as_text, &["sex", "cp"], &schema);
        let b = align_features(&as_int, &["sex", "cp"], &schema);
        assert_eq!(a, b);
        assert_eq!(a.get("sex_1"), Some(Some(1.0)));
    }

    #[test]
    fn test_reference_category_encodes_as_all_zeros() {
        let schema = heart_schema();
        let raw = record(&[("cp", 0i64.into())]);
        let aligned = align_features(&raw, &["sex", "cp"], &schema);
        assert_eq!(aligned.get("cp_1"), Some(Some(0.0)));
        assert_eq!(aligned.get("cp_2"), Some(Some(0.0)));
        assert_eq!(aligned.get("cp_3"), Some(Some(0.0)));
    }

    #[test]
    fn test_unseen_category_is_dropped() {
        let schema = heart_schema();
        let raw = record(&[("age", 40.0.into()), ("cp", 9i64.into())]);
        let aligned = align_features(&raw, &["sex", "cp"], &schema);
        assert_eq!(aligned.len(), schema.len());
        assert!(aligned.get("cp_9").is_none());
        assert_eq!(aligned.get("cp_1"), Some(Some(0.0)));
    }

    #[test]
    fn test_missing_categorical_keeps_width() {
        let schema = heart_schema();
        let raw = record(&[("age", 40.0.into()), ("chol", 200.0.into())]);
        let aligned = align_features(&raw, &["sex", "cp"], &schema);
        assert_eq!(aligned.names(), schema.names().as_slice());
        assert_eq!(aligned.get("sex_1"), Some(Some(0.0)));
    }

    #[test]
    fn test_non_numeric_becomes_missing() {
        let schema = FeatureSchema::from_names(&["age", "bmi"], &[]);
        let raw = record(&[("age", "forty".into()), ("bmi", RawValue::Missing)]);
        let aligned = align_features(&raw, &[], &schema);
        assert_eq!(aligned.values(), &[None, None]);
        assert_eq!(aligned.missing_count(), 2);
    }

    #[test]
    fn test_absent_numeric_column_is_zero_filled() {
        let schema = FeatureSchema::from_names(&["age", "bmi"], &[]);
        let raw = record(&[("age", 30.0.into()), ("extra", 1.0.into())]);
        let aligned = align_features(&raw, &[], &schema);
        assert_eq!(aligned.values(), &[Some(30.0), Some(0.0)]);
    }

    #[test]
    fn test_default_categorical_schema() {
        let schema = CategoricalSchema::default();
        assert_eq!(schema.columns_for(Disease::Heart).len(), 8);
        assert!(schema.columns_for(Disease::Diabetes).is_empty());
    }
}
