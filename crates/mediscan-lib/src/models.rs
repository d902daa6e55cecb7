//! Core data models for the prediction service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single submitted form value
///
/// Deserializes from a JSON number, string or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    /// Parse a dataset cell: empty becomes missing, numeric text becomes a number
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return RawValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => RawValue::Number(v),
            Err(_) => RawValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric coercion; anything that is not a finite number is missing
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) if v.is_finite() => Some(*v),
            RawValue::Number(_) => None,
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            RawValue::Missing => None,
        }
    }

    /// Canonical category label used for one-hot column names
    ///
    /// Integral numbers render without a decimal point and numeric text is
    /// normalized the same way, so `1`, `1.0` and `"1"` share the label `"1"`.
    pub fn category_label(&self) -> Option<String> {
        match self {
            RawValue::Missing => None,
            RawValue::Number(v) => Some(format_number(*v)),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<f64>() {
                    Ok(v) => Some(format_number(v)),
                    Err(_) => Some(trimmed.to_string()),
                }
            }
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Number(v as f64)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// One user submission: feature name to raw value
pub type RawInputRecord = BTreeMap<String, RawValue>;

/// Supported disease models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Diabetes,
    Heart,
    Parkinson,
}

const HEART_CATEGORICAL: &[&str] = &[
    "sex", "cp", "fbs", "restecg", "exang", "slope", "ca", "thal",
];

impl Disease {
    pub const ALL: [Disease; 3] = [Disease::Diabetes, Disease::Heart, Disease::Parkinson];

    /// Model key used for artifact file names and URLs
    pub fn key(&self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes",
            Disease::Heart => "heart",
            Disease::Parkinson => "parkinson",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Disease::Diabetes => "Diabetes",
            Disease::Heart => "Heart Disease",
            Disease::Parkinson => "Parkinson's",
        }
    }

    /// Reference/training dataset file name
    pub fn data_file(&self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes.csv",
            Disease::Heart => "heart.csv",
            Disease::Parkinson => "parkinson.csv",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            Disease::Diabetes => "Outcome",
            Disease::Heart => "target",
            Disease::Parkinson => "status",
        }
    }

    /// Identifier columns removed before training (ignored when absent)
    pub fn drop_columns(&self) -> &'static [&'static str] {
        match self {
            Disease::Parkinson => &["name"],
            _ => &[],
        }
    }

    /// Columns one-hot encoded at training and inference time
    pub fn categorical_columns(&self) -> &'static [&'static str] {
        match self {
            Disease::Heart => HEART_CATEGORICAL,
            _ => &[],
        }
    }

    /// Result wording for the (positive, negative) class
    pub fn result_labels(&self) -> (&'static str, &'static str) {
        match self {
            Disease::Diabetes => ("High Risk", "Low Risk"),
            Disease::Heart => ("Risk Detected", "Appears Healthy"),
            Disease::Parkinson => ("Indicators Found", "No Indicators Found"),
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error for unrecognized model keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model key: {0}")]
pub struct UnknownDisease(pub String);

impl FromStr for Disease {
    type Err = UnknownDisease;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "diabetes" => Ok(Disease::Diabetes),
            "heart" | "heart disease" | "heart_disease" | "heart-disease" => Ok(Disease::Heart),
            "parkinson" | "parkinsons" | "parkinson's" => Ok(Disease::Parkinson),
            _ => Err(UnknownDisease(s.to_string())),
        }
    }
}

/// Result of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub disease: Disease,
    /// Predicted class, 0 (negative) or 1 (positive)
    pub label: u8,
    /// Probability of the predicted class, in percent
    pub confidence: f64,
    pub model_version: String,
}

impl PredictionOutcome {
    /// Confidence with two decimals, e.g. `87.32%`
    pub fn confidence_display(&self) -> String {
        format!("{:.2}%", self.confidence)
    }

    pub fn is_positive(&self) -> bool {
        self.label == 1
    }

    /// Human-readable result for the disease
    pub fn result_text(&self) -> &'static str {
        let (positive, negative) = self.disease.result_labels();
        if self.is_positive() {
            positive
        } else {
            negative
        }
    }
}
