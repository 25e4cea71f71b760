//! Optional per-feature transforms applied ahead of the decomposition.

use log::info;
use ndarray::{Array2, Axis};

use crate::error::PreprocessError;

/// The transform applied to the feature matrix before PCA.
///
/// Standardization and the log transform are mutually exclusive by
/// construction: a single value of this enum is the whole configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    None,
    /// Per feature: subtract the column mean, divide by the population
    /// standard deviation (ddof = 0).
    Standardize,
    /// Elementwise natural logarithm.
    Log,
}

impl Transform {
    /// Builds a transform from the two CLI flags, rejecting the ambiguous
    /// both-set combination instead of silently preferring one.
    pub fn from_flags(standardize: bool, log: bool) -> Result<Self, PreprocessError> {
        match (standardize, log) {
            (true, true) => Err(PreprocessError::ConflictingTransforms),
            (true, false) => Ok(Self::Standardize),
            (false, true) => Ok(Self::Log),
            (false, false) => Ok(Self::None),
        }
    }

    /// Suffix appended to the input basename before derived artifact names
    /// are built, so transformed runs never overwrite untransformed ones.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Standardize => "-std",
            Self::Log => "-log",
        }
    }

    /// Human-readable tag used in the report.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Standardize => Some("Standardised"),
            Self::Log => Some("Logarithmic"),
        }
    }

    /// Applies the transform, producing a new matrix.
    ///
    /// `feature_names` is order-aligned with the matrix columns and is used
    /// to name the offending column in errors.
    pub fn apply(
        self,
        matrix: &Array2<f64>,
        feature_names: &[String],
    ) -> Result<Array2<f64>, PreprocessError> {
        match self {
            Self::None => Ok(matrix.clone()),
            Self::Standardize => standardize(matrix, feature_names),
            Self::Log => log_transform(matrix, feature_names),
        }
    }
}

fn standardize(
    matrix: &Array2<f64>,
    feature_names: &[String],
) -> Result<Array2<f64>, PreprocessError> {
    let mut out = matrix.clone();
    for (col_idx, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
        let mean = column.mean().unwrap_or(0.0);
        let std_dev = column.std(0.0);
        if std_dev == 0.0 {
            return Err(PreprocessError::DegenerateFeature {
                feature: feature_name(feature_names, col_idx),
            });
        }
        column.mapv_inplace(|v| (v - mean) / std_dev);
    }
    info!("standardized {} feature columns", matrix.ncols());
    Ok(out)
}

fn log_transform(
    matrix: &Array2<f64>,
    feature_names: &[String],
) -> Result<Array2<f64>, PreprocessError> {
    // Validate first: the engine must never see NaN or -inf from ln().
    for ((row, col), &value) in matrix.indexed_iter() {
        if value <= 0.0 {
            return Err(PreprocessError::NonPositiveValue {
                feature: feature_name(feature_names, col),
                row,
            });
        }
    }
    info!("applied log transform to {} entries", matrix.len());
    Ok(matrix.mapv(f64::ln))
}

fn feature_name(feature_names: &[String], col_idx: usize) -> String {
    feature_names
        .get(col_idx)
        .cloned()
        .unwrap_or_else(|| format!("column {}", col_idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Axis};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn standardize_yields_zero_mean_unit_variance() {
        let matrix = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let out = Transform::Standardize
            .apply(&matrix, &names(&["a", "b"]))
            .unwrap();
        for column in out.axis_iter(Axis(1)) {
            assert_abs_diff_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(column.std(0.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn standardize_rejects_constant_column() {
        let matrix = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        match Transform::Standardize.apply(&matrix, &names(&["a", "b"])) {
            Err(PreprocessError::DegenerateFeature { feature }) => assert_eq!(feature, "b"),
            other => panic!("expected DegenerateFeature, got {:?}", other),
        }
    }

    #[test]
    fn log_transform_applies_natural_log() {
        let matrix = array![[1.0, std::f64::consts::E], [std::f64::consts::E, 1.0]];
        let out = Transform::Log.apply(&matrix, &names(&["a", "b"])).unwrap();
        assert_abs_diff_eq!(out[[0, 0]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[[0, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn log_transform_rejects_non_positive_entries() {
        let matrix = array![[1.0, 2.0], [0.0, 3.0]];
        match Transform::Log.apply(&matrix, &names(&["a", "b"])) {
            Err(PreprocessError::NonPositiveValue { feature, row }) => {
                assert_eq!(feature, "a");
                assert_eq!(row, 1);
            }
            other => panic!("expected NonPositiveValue, got {:?}", other),
        }
        let negative = array![[1.0, -2.0]];
        assert!(matches!(
            Transform::Log.apply(&negative, &names(&["a", "b"])),
            Err(PreprocessError::NonPositiveValue { .. })
        ));
    }

    #[test]
    fn none_is_identity() {
        let matrix = array![[1.0, 2.0], [3.0, 4.0]];
        let out = Transform::None.apply(&matrix, &names(&["a", "b"])).unwrap();
        assert_eq!(out, matrix);
    }

    #[test]
    fn both_flags_set_is_a_configuration_error() {
        assert!(matches!(
            Transform::from_flags(true, true),
            Err(PreprocessError::ConflictingTransforms)
        ));
        assert_eq!(
            Transform::from_flags(true, false).unwrap(),
            Transform::Standardize
        );
        assert_eq!(Transform::from_flags(false, true).unwrap(), Transform::Log);
        assert_eq!(Transform::from_flags(false, false).unwrap(), Transform::None);
    }
}
