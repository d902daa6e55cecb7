//! Logistic regression classifier
//!
//! Binary classifier over standardized features. Fitted with L2-regularized
//! batch gradient descent and persisted as plain JSON weights.

use super::Classifier;
use crate::error::{TrainingError, TransformError, TransformStage};
use crate::predictor::transform::check_width;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Gradient descent settings
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop when the largest gradient component falls below this
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 0.5,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    /// Fit on a standardized design matrix and 0/1 targets
    pub fn fit(
        feature_names: Vec<String>,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: &FitConfig,
    ) -> Result<Self, TrainingError> {
        check_width(TransformStage::Model, feature_names.len(), x.ncols())?;
        if x.nrows() != y.len() || x.nrows() == 0 {
            return Err(TrainingError::Transform(TransformError::WidthMismatch {
                stage: TransformStage::Model,
                expected: x.nrows(),
                actual: y.len(),
            }));
        }

        let n = x.nrows() as f64;
        let mut w = Array1::<f64>::zeros(x.ncols());
        let mut b = 0.0;
        let mut converged = false;

        for iteration in 0..config.max_iter {
            let z = x.dot(&w) + b;
            let p = z.mapv(sigmoid);
            let err = &p - y;

            let grad_w = x.t().dot(&err) / n + &w / (config.c * n);
            let grad_b = err.sum() / n;

            w = w - &grad_w * config.learning_rate;
            b -= grad_b * config.learning_rate;

            let max_grad = grad_w
                .iter()
                .fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
            if max_grad < config.tolerance {
                debug!(iterations = iteration + 1, "Logistic regression converged");
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                max_iter = config.max_iter,
                "Logistic regression reached max_iter before converging"
            );
        }

        Ok(Self {
            feature_names,
            coefficients: w.to_vec(),
            intercept: b,
        })
    }

    fn decision_function(&self, features: &[f64]) -> Result<f64, TransformError> {
        check_width(TransformStage::Model, self.coefficients.len(), features.len())?;
        let z = ArrayView1::from(features).dot(&ArrayView1::from(self.coefficients.as_slice()))
            + self.intercept;
        if z.is_finite() {
            Ok(z)
        } else {
            Err(TransformError::NonFinite {
                stage: TransformStage::Model,
                feature: "decision_function".to_string(),
            })
        }
    }

    /// Fraction of rows whose predicted label equals the target
    pub fn accuracy(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64, TransformError> {
        if x.nrows() == 0 {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for (row, target) in x.rows().into_iter().zip(y.iter()) {
            let features = row.to_vec();
            if f64::from(self.predict(&features)?) == *target {
                correct += 1;
            }
        }
        Ok(correct as f64 / x.nrows() as f64)
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, features: &[f64]) -> Result<u8, TransformError> {
        let [_, positive] = self.predict_proba(features)?;
        Ok(u8::from(positive > 0.5))
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], TransformError> {
        let p = sigmoid(self.decision_function(features)?);
        Ok([1.0 - p, p])
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sigmoid_bounds() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
    }

    #[test]
    fn test_predict_proba_sums_to_one() {
        let model = LogisticRegression {
            feature_names: vec!["a".into(), "b".into()],
            coefficients: vec![0.8, -1.2],
            intercept: 0.1,
        };
        let [neg, pos] = model.predict_proba(&[1.0, 0.5]).unwrap();
        assert!((neg + pos - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0, 0.5]).unwrap(), u8::from(pos > 0.5));
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let model = LogisticRegression {
            feature_names: vec!["a".into()],
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        let err = model.predict(&[1.0, 2.0]).unwrap_err();
        assert_eq!(err.stage(), TransformStage::Model);
    }

    #[test]
    fn test_fit_separable_data() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let model =
            LogisticRegression::fit(vec!["x".into()], &x, &y, &FitConfig::default()).unwrap();
        assert!(model.coefficients[0] > 0.0);
        assert_eq!(model.accuracy(&x, &y).unwrap(), 1.0);
        assert_eq!(model.predict(&[3.0]).unwrap(), 1);
        assert_eq!(model.predict(&[-3.0]).unwrap(), 0);
    }
}
