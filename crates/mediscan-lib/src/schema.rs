//! Training-time feature schema
//!
//! A model is trained on an ordered list of columns. Numeric columns come
//! straight from the input record; indicator columns are one-hot encodings
//! of a categorical source column. The schema owns the reindex operation
//! that maps an arbitrary encoded row onto exactly these columns.

use crate::models::RawValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between source column and category in indicator names
pub const INDICATOR_SEPARATOR: char = '_';

/// Name of the indicator column for `source == category`
pub fn indicator_name(source: &str, category: &str) -> String {
    format!("{}{}{}", source, INDICATOR_SEPARATOR, category)
}

/// Kind of a trained column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeatureKind {
    Numeric,
    Indicator { source: String, category: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
}

impl FeatureColumn {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Numeric,
        }
    }

    pub fn indicator(source: &str, category: &str) -> Self {
        Self {
            name: indicator_name(source, category),
            kind: FeatureKind::Indicator {
                source: source.to_string(),
                category: category.to_string(),
            },
        }
    }
}

/// A row after categorical encoding, keyed by column name
pub type EncodedRow = BTreeMap<String, RawValue>;

/// Ordered feature schema a model was trained on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<FeatureColumn>) -> Self {
        Self { columns }
    }

    /// Rebuild a schema from stored column names
    ///
    /// A name is an indicator when it starts with `<source>_` for one of the
    /// given categorical source columns.
    pub fn from_names<S: AsRef<str>>(names: &[S], categorical: &[&str]) -> Self {
        let columns = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                categorical
                    .iter()
                    .find_map(|source| {
                        name.strip_prefix(source)
                            .and_then(|rest| rest.strip_prefix(INDICATOR_SEPARATOR))
                            .filter(|category| !category.is_empty())
                            .map(|category| FeatureColumn::indicator(source, category))
                    })
                    .unwrap_or_else(|| FeatureColumn::numeric(name))
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Categorical source columns referenced by indicator columns, in order
    pub fn categorical_sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for column in &self.columns {
            if let FeatureKind::Indicator { source, .. } = &column.kind {
                if !sources.contains(&source.as_str()) {
                    sources.push(source);
                }
            }
        }
        sources
    }

    /// Map an encoded row onto this schema
    ///
    /// Output has exactly `len()` cells in schema order. Columns the row
    /// lacks are filled with 0, columns the schema lacks are dropped.
    pub fn reindex(&self, row: &EncodedRow) -> Vec<RawValue> {
        self.columns
            .iter()
            .map(|column| {
                row.get(&column.name)
                    .cloned()
                    .unwrap_or(RawValue::Number(0.0))
            })
            .collect()
    }

    /// Whether another list of names matches this schema exactly
    pub fn matches_names<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.columns.len() == names.len()
            && self
                .columns
                .iter()
                .zip(names)
                .all(|(column, name)| column.name == name.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_names_detects_indicators() {
        let schema = FeatureSchema::from_names(&["age", "sex_1", "cp_2", "chol"], &["sex", "cp"]);
        assert_eq!(schema.columns()[0].kind, FeatureKind::Numeric);
        assert_eq!(
            schema.columns()[1].kind,
            FeatureKind::Indicator {
                source: "sex".to_string(),
                category: "1".to_string()
            }
        );
        assert_eq!(schema.categorical_sources(), vec!["sex", "cp"]);
    }

    #[test]
    fn test_reindex_fills_and_drops() {
        let schema = FeatureSchema::new(vec![
            FeatureColumn::numeric("age"),
            FeatureColumn::indicator("sex", "1"),
            FeatureColumn::numeric("chol"),
        ]);
        let mut row = EncodedRow::new();
        row.insert("chol".to_string(), RawValue::Number(240.0));
        row.insert("age".to_string(), RawValue::Number(63.0));
        row.insert("sex_7".to_string(), RawValue::Number(1.0));

        let cells = schema.reindex(&row);
        assert_eq!(
            cells,
            vec![
                RawValue::Number(63.0),
                RawValue::Number(0.0),
                RawValue::Number(240.0)
            ]
        );
    }

    #[test]
    fn test_matches_names() {
        let schema = FeatureSchema::from_names(&["a", "b"], &[]);
        assert!(schema.matches_names(&["a", "b"]));
        assert!(!schema.matches_names(&["b", "a"]));
        assert!(!schema.matches_names(&["a"]));
    }
}
