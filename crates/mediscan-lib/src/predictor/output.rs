//! Prediction output formatting
//!
//! Turns a predicted label and class probabilities into a PredictionOutcome
//! and flags predictions that sit close to the decision boundary.

use crate::models::{Disease, PredictionOutcome};

/// Confidence (percent) below which a prediction is reported as uncertain
pub const LOW_CONFIDENCE_PERCENT: f64 = 60.0;

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Low confidence threshold, in percent
    pub low_confidence_threshold: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: LOW_CONFIDENCE_PERCENT,
        }
    }
}

/// Formats classifier output into a PredictionOutcome
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self {
            config: OutputConfig::default(),
        }
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Build the outcome for `label` using the probability of that label
    pub fn format(
        &self,
        disease: Disease,
        label: u8,
        probabilities: [f64; 2],
        model_version: &str,
    ) -> PredictionOutcome {
        let label = label.min(1);
        let probability = probabilities[usize::from(label)].clamp(0.0, 1.0);
        PredictionOutcome {
            disease,
            label,
            confidence: probability * 100.0,
            model_version: model_version.to_string(),
        }
    }

    pub fn is_low_confidence(&self, outcome: &PredictionOutcome) -> bool {
        outcome.confidence < self.config.low_confidence_threshold
    }

    /// Explanation shown next to uncertain predictions
    pub fn low_confidence_reason(&self, outcome: &PredictionOutcome) -> Option<String> {
        if self.is_low_confidence(outcome) {
            Some(format!(
                "Prediction is close to the decision boundary ({}); \
                 consider re-checking the inputs",
                outcome.confidence_display()
            ))
        } else {
            None
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}
