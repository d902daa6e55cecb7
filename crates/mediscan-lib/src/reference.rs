//! Reference schema provider
//!
//! Derives the input form for a disease from its training CSV: which
//! fields to ask for, their ranges and defaults, and which of them are
//! categorical.

use crate::dataset::Dataset;
use crate::error::DatasetError;
use crate::models::{Disease, RawValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fallbacks when a numeric column has no usable values
const DEFAULT_MIN: f64 = 0.0;
const DEFAULT_MAX: f64 = 1000.0;
const DEFAULT_VALUE: f64 = 0.0;

/// One input field of a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FormField {
    Numeric {
        name: String,
        min: f64,
        max: f64,
        default: f64,
    },
    Categorical {
        name: String,
        options: Vec<RawValue>,
        default: RawValue,
    },
}

impl FormField {
    pub fn name(&self) -> &str {
        match self {
            FormField::Numeric { name, .. } | FormField::Categorical { name, .. } => name,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, FormField::Categorical { .. })
    }

    /// Value a form starts with
    pub fn default_value(&self) -> RawValue {
        match self {
            FormField::Numeric { default, .. } => RawValue::Number(*default),
            FormField::Categorical { default, .. } => default.clone(),
        }
    }
}

/// Ordered input fields for one disease, in dataset column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub disease: Disease,
    pub fields: Vec<FormField>,
}

impl FormSchema {
    /// Pre-encoding feature names, in order
    pub fn feature_names(&self) -> Vec<&str> {
        self.fields.iter().map(FormField::name).collect()
    }

    pub fn categorical_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_categorical())
            .map(FormField::name)
            .collect()
    }

    /// A complete record filled with every field's default
    pub fn defaults(&self) -> BTreeMap<String, RawValue> {
        self.fields
            .iter()
            .map(|f| (f.name().to_string(), f.default_value()))
            .collect()
    }
}

/// Builds form schemas from the datasets under a data directory
#[derive(Debug, Clone)]
pub struct ReferenceSchemaProvider {
    data_dir: PathBuf,
}

impl ReferenceSchemaProvider {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dataset_path(&self, disease: Disease) -> PathBuf {
        self.data_dir.join(disease.data_file())
    }

    pub fn has_dataset(&self, disease: Disease) -> bool {
        self.dataset_path(disease).exists()
    }

    /// Read the dataset and describe its input fields
    pub fn form_schema(&self, disease: Disease) -> Result<FormSchema, DatasetError> {
        let dataset = Dataset::from_path(&self.dataset_path(disease))?;
        form_schema_for(disease, &dataset)
    }
}

/// Form schema for an already loaded dataset
pub fn form_schema_for(disease: Disease, dataset: &Dataset) -> Result<FormSchema, DatasetError> {
    let excluded: Vec<&str> = std::iter::once(disease.target_column())
        .chain(disease.drop_columns().iter().copied())
        .collect();
    let categorical = disease.categorical_columns();

    let mut fields = Vec::new();
    for name in dataset.columns() {
        if excluded.contains(&name.as_str()) {
            continue;
        }
        let cells = dataset.column(name)?;
        let field = if categorical.contains(&name.as_str()) {
            categorical_field(name, &cells)
        } else {
            numeric_field(name, &cells)
        };
        fields.push(field);
    }

    Ok(FormSchema { disease, fields })
}

fn numeric_field(name: &str, cells: &[&RawValue]) -> FormField {
    let values: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
    if values.is_empty() {
        return FormField::Numeric {
            name: name.to_string(),
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            default: DEFAULT_VALUE,
        };
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    FormField::Numeric {
        name: name.to_string(),
        min,
        max,
        default: mean.clamp(min, max),
    }
}

/// Options sorted (numbers before text), default is the most frequent option
fn categorical_field(name: &str, cells: &[&RawValue]) -> FormField {
    let mut counts: BTreeMap<String, (RawValue, usize)> = BTreeMap::new();
    for cell in cells {
        if let Some(label) = cell.category_label() {
            counts
                .entry(label)
                .or_insert_with(|| (canonical_option(cell), 0))
                .1 += 1;
        }
    }

    let mut options: Vec<(RawValue, usize)> = counts.into_values().collect();
    options.sort_by(|(a, _), (b, _)| compare_options(a, b));

    // Ties go to the smallest option
    let default = options
        .iter()
        .fold(None::<&(RawValue, usize)>, |best, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
        .map(|(value, _)| value.clone())
        .unwrap_or(RawValue::Missing);

    FormField::Categorical {
        name: name.to_string(),
        options: options.into_iter().map(|(value, _)| value).collect(),
        default,
    }
}

fn canonical_option(cell: &RawValue) -> RawValue {
    match cell.as_f64() {
        Some(v) => RawValue::Number(v),
        None => cell.clone(),
    }
}

fn compare_options(a: &RawValue, b: &RawValue) -> Ordering {
    match (a, b) {
        (RawValue::Number(x), RawValue::Number(y)) => x.total_cmp(y),
        (RawValue::Number(_), _) => Ordering::Less,
        (_, RawValue::Number(_)) => Ordering::Greater,
        (RawValue::Text(x), RawValue::Text(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
