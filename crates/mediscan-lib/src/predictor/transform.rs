//! Fitted preprocessing transforms
//!
//! Both transforms store the column names they were fitted on so a loaded
//! bundle can be checked for consistency before it serves predictions.

use crate::error::{TransformError, TransformStage};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Mean imputation fitted at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanImputer {
    pub feature_names: Vec<String>,
    /// Per-column fill values
    pub statistics: Vec<f64>,
}

impl MeanImputer {
    /// Fit column means over present values
    ///
    /// A column with no observed value is filled with 0.0 so the output
    /// width always equals the input width.
    pub fn fit(
        feature_names: Vec<String>,
        rows: &[Vec<Option<f64>>],
    ) -> Result<Self, TransformError> {
        let width = feature_names.len();
        let mut sums = vec![0.0; width];
        let mut counts = vec![0usize; width];

        for row in rows {
            check_width(TransformStage::Imputer, width, row.len())?;
            for (idx, value) in row.iter().enumerate() {
                if let Some(v) = value {
                    sums[idx] += v;
                    counts[idx] += 1;
                }
            }
        }

        let statistics = sums
            .iter()
            .zip(&counts)
            .zip(&feature_names)
            .map(|((sum, count), name)| {
                if *count == 0 {
                    warn!(feature = %name, "No observed values, imputing 0.0");
                    0.0
                } else {
                    sum / *count as f64
                }
            })
            .collect();

        Ok(Self {
            feature_names,
            statistics,
        })
    }

    pub fn n_features(&self) -> usize {
        self.statistics.len()
    }

    pub fn transform(&self, row: &[Option<f64>]) -> Result<Vec<f64>, TransformError> {
        check_width(TransformStage::Imputer, self.n_features(), row.len())?;
        Ok(row
            .iter()
            .zip(&self.statistics)
            .map(|(value, fill)| value.unwrap_or(*fill))
            .collect())
    }
}

/// Standardization fitted at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    /// Population standard deviation per column, 1.0 for constant columns
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(feature_names: Vec<String>, x: &Array2<f64>) -> Result<Self, TransformError> {
        check_width(TransformStage::Scaler, feature_names.len(), x.ncols())?;
        let (mean, scale) = match x.mean_axis(Axis(0)) {
            Some(mean) => {
                let std = x.std_axis(Axis(0), 0.0);
                let scale = std
                    .iter()
                    .map(|s| if *s > f64::EPSILON { *s } else { 1.0 })
                    .collect();
                (mean.to_vec(), scale)
            }
            None => (vec![0.0; x.ncols()], vec![1.0; x.ncols()]),
        };
        Ok(Self {
            feature_names,
            mean,
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, TransformError> {
        check_width(TransformStage::Scaler, self.n_features(), row.len())?;
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .enumerate()
            .map(|(idx, (x, (mean, scale)))| {
                let z = (x - mean) / scale;
                if z.is_finite() {
                    Ok(z)
                } else {
                    Err(TransformError::NonFinite {
                        stage: TransformStage::Scaler,
                        feature: self
                            .feature_names
                            .get(idx)
                            .cloned()
                            .unwrap_or_else(|| idx.to_string()),
                    })
                }
            })
            .collect()
    }

    /// Standardize every row of a matrix
    pub fn transform_matrix(&self, x: &Array2<f64>) -> Result<Array2<f64>, TransformError> {
        check_width(TransformStage::Scaler, self.n_features(), x.ncols())?;
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for (idx, value) in row.iter_mut().enumerate() {
                *value = (*value - self.mean[idx]) / self.scale[idx];
            }
        }
        Ok(out)
    }
}

pub(crate) fn check_width(
    stage: TransformStage,
    expected: usize,
    actual: usize,
) -> Result<(), TransformError> {
    if expected == actual {
        Ok(())
    } else {
        Err(TransformError::WidthMismatch {
            stage,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_imputer_fills_with_column_mean() {
        let rows = vec![
            vec![Some(1.0), Some(10.0)],
            vec![Some(3.0), None],
            vec![None, Some(20.0)],
        ];
        let imputer = MeanImputer::fit(names(2), &rows).unwrap();
        assert_eq!(imputer.statistics, vec![2.0, 15.0]);
        assert_eq!(imputer.transform(&[None, Some(1.0)]).unwrap(), vec![2.0, 1.0]);
    }

    #[test]
    fn test_imputer_all_missing_column() {
        let rows = vec![vec![Some(1.0), None], vec![Some(2.0), None]];
        let imputer = MeanImputer::fit(names(2), &rows).unwrap();
        assert_eq!(imputer.statistics[1], 0.0);
    }

    #[test]
    fn test_imputer_rejects_wrong_width() {
        let imputer = MeanImputer {
            feature_names: names(2),
            statistics: vec![0.0, 0.0],
        };
        let err = imputer.transform(&[Some(1.0)]).unwrap_err();
        assert_eq!(err.stage(), TransformStage::Imputer);
    }

    #[test]
    fn test_scaler_standardizes() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let scaler = StandardScaler::fit(names(2), &x).unwrap();
        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[3.0, 5.0]).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_scaler_matrix_matches_rows() {
        let x = array![[1.0, 2.0], [3.0, 8.0], [5.0, 2.0]];
        let scaler = StandardScaler::fit(names(2), &x).unwrap();
        let matrix = scaler.transform_matrix(&x).unwrap();
        let row = scaler.transform(&[3.0, 8.0]).unwrap();
        assert!((matrix[[1, 0]] - row[0]).abs() < 1e-12);
        assert!((matrix[[1, 1]] - row[1]).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_rejects_non_finite() {
        let scaler = StandardScaler {
            feature_names: names(1),
            mean: vec![0.0],
            scale: vec![1.0],
        };
        let err = scaler.transform(&[f64::INFINITY]).unwrap_err();
        assert!(matches!(err, TransformError::NonFinite { .. }));
    }
}
