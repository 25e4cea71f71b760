//! The PCA engine.
//!
//! [`compute`] consumes a dense N x P feature matrix and produces the full
//! decomposition: per-sample scores, explained-variance ratios, and unit-norm
//! loadings, all ranked by explained variance. Every invocation re-derives
//! everything from the input matrix alone; there is no hidden state.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::debug;
use ndarray::{s, Array1, Array2, Axis};
use ndarray_linalg::svd::SVD;
use serde::{Deserialize, Serialize};

use crate::error::PcaError;

/// Tolerance for the unit-norm loading check.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-8;
/// Tolerance for the elementwise reconstruction identity check.
pub const RECONSTRUCTION_TOLERANCE: f64 = 1e-8;
/// Tolerance for pairwise orthogonality of loading rows.
pub const ORTHOGONALITY_TOLERANCE: f64 = 1e-6;

/// Outcome of one internal self-check: the worst measured deviation and the
/// tolerance it was held to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub max_deviation: f64,
    pub tolerance: f64,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.max_deviation <= self.tolerance
    }
}

/// Queryable results of the decomposition self-checks.
///
/// A failed check is a programming-error signal, not a data problem:
/// [`compute`] refuses to return a result that fails any of them, and the
/// measured deviations stay available here for inspection and testing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Euclidean norm of every loading row vs 1.0.
    pub unit_norm: CheckOutcome,
    /// `X . loadings^T` vs the stored scores, recomputed from the stored mean.
    pub reconstruction: CheckOutcome,
    /// Dot products of distinct loading rows vs 0.0.
    pub orthogonality: CheckOutcome,
}

impl Diagnostics {
    pub fn all_passed(&self) -> bool {
        self.unit_norm.passed() && self.reconstruction.passed() && self.orthogonality.passed()
    }
}

/// The immutable output of one engine invocation.
///
/// `scores` is N x K, `loadings` is K x P with orthonormal rows, and
/// `explained_variance_ratio` holds K non-negative values in descending
/// order summing to 1, where K = min(N, P).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaResult {
    mean: Array1<f64>,
    scores: Array2<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
    loadings: Array2<f64>,
    diagnostics: Diagnostics,
}

impl PcaResult {
    pub fn n_components(&self) -> usize {
        self.loadings.nrows()
    }

    /// Column means of the input matrix, the centering vector.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Sample coordinates in component space, shape (n_samples, k).
    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    /// Eigenvalues of the covariance matrix, descending.
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    /// Fraction of total variance captured per component, descending.
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    /// Unit-norm principal axes as rows, shape (k, n_features).
    pub fn loadings(&self) -> &Array2<f64> {
        &self.loadings
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Converts a failed self-check into a hard error.
    pub fn verify(&self) -> Result<(), PcaError> {
        let checks: [(&'static str, &CheckOutcome); 3] = [
            ("unit-norm", &self.diagnostics.unit_norm),
            ("reconstruction", &self.diagnostics.reconstruction),
            ("orthogonality", &self.diagnostics.orthogonality),
        ];
        for (name, outcome) in checks {
            if !outcome.passed() {
                return Err(PcaError::Consistency {
                    check: name,
                    max_deviation: outcome.max_deviation,
                    tolerance: outcome.tolerance,
                });
            }
        }
        Ok(())
    }

    /// Saves the result to a file using bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PcaError> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| PcaError::Model(format!("failed to serialize result: {}", e)))?;
        Ok(())
    }

    /// Loads a result previously written by [`PcaResult::save`], validating
    /// internal consistency before handing it back.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PcaError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let result: PcaResult =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
                .map_err(|e| PcaError::Model(format!("failed to deserialize result: {}", e)))?;

        let k = result.loadings.nrows();
        if result.scores.ncols() != k
            || result.explained_variance.len() != k
            || result.explained_variance_ratio.len() != k
        {
            return Err(PcaError::Model(format!(
                "loaded result is inconsistent: {} loading rows, {} score columns, \
                 {} variances, {} ratios",
                k,
                result.scores.ncols(),
                result.explained_variance.len(),
                result.explained_variance_ratio.len()
            )));
        }
        if result.mean.len() != result.loadings.ncols() {
            return Err(PcaError::Model(format!(
                "loaded result is inconsistent: mean has {} entries, loadings have {} columns",
                result.mean.len(),
                result.loadings.ncols()
            )));
        }
        if result
            .explained_variance_ratio
            .iter()
            .chain(result.explained_variance.iter())
            .any(|&v| !v.is_finite() || v < 0.0)
        {
            return Err(PcaError::Model(
                "loaded result contains non-finite or negative variances".to_string(),
            ));
        }
        result.verify()?;
        Ok(result)
    }
}

/// Computes the full PCA decomposition of a feature matrix.
///
/// The matrix is centered by its column means and decomposed with a singular
/// value decomposition; all min(N, P) components are kept, none truncated.
/// The self-checks run before the result is returned and any failure is
/// surfaced as [`PcaError::Consistency`].
///
/// # Errors
///
/// Fails on fewer than 2 samples, zero features, non-finite entries, a matrix
/// with no variance at all, or a decomposition that does not converge.
pub fn compute(matrix: &Array2<f64>) -> Result<PcaResult, PcaError> {
    let n_samples = matrix.nrows();
    let n_features = matrix.ncols();

    if n_samples < 2 {
        return Err(PcaError::InsufficientSamples { n: n_samples });
    }
    if n_features < 1 {
        return Err(PcaError::InsufficientFeatures);
    }
    for ((row, col), &value) in matrix.indexed_iter() {
        if !value.is_finite() {
            return Err(PcaError::NonFiniteValue { row, col });
        }
    }

    // 1) Center by column means. n_samples >= 2, so the mean exists.
    let mean = matrix
        .mean_axis(Axis(0))
        .ok_or(PcaError::InsufficientSamples { n: n_samples })?;
    let mut centered = matrix.to_owned();
    centered -= &mean;

    // 2) SVD of the centered matrix. LAPACK returns singular values in
    //    descending order, which fixes the component ranking
    //    deterministically, ties included.
    let (_, singular_values, vt) = centered.svd(false, true)?;
    let vt = vt.ok_or_else(|| {
        PcaError::Internal("SVD did not return right singular vectors".to_string())
    })?;

    let k = n_samples.min(n_features).min(singular_values.len());
    let loadings = vt.slice(s![..k, ..]).to_owned();

    // 3) Eigenvalues of the covariance matrix are s_i^2 / (N - 1).
    let explained_variance = singular_values
        .slice(s![..k])
        .mapv(|s_val| s_val.powi(2) / (n_samples - 1) as f64);
    let total_variance = explained_variance.sum();
    if total_variance <= 0.0 {
        return Err(PcaError::ZeroVariance);
    }
    let explained_variance_ratio = explained_variance.mapv(|v| v / total_variance);

    // 4) Project: scores = X . loadings^T, from the same centered matrix.
    let scores = centered.dot(&loadings.t());

    let diagnostics = run_checks(matrix, &mean, &loadings, &scores);
    debug!(
        "computed {} components: unit-norm dev {:e}, reconstruction dev {:e}, \
         orthogonality dev {:e}",
        k,
        diagnostics.unit_norm.max_deviation,
        diagnostics.reconstruction.max_deviation,
        diagnostics.orthogonality.max_deviation
    );

    let result = PcaResult {
        mean,
        scores,
        explained_variance,
        explained_variance_ratio,
        loadings,
        diagnostics,
    };
    result.verify()?;
    Ok(result)
}

/// Runs the self-checks against a freshly re-centered copy of the input.
///
/// The reconstruction pass deliberately starts over from the raw matrix and
/// the stored mean: a decomposition accidentally refit with a different
/// centering would agree with its own intermediates but fail here.
fn run_checks(
    matrix: &Array2<f64>,
    mean: &Array1<f64>,
    loadings: &Array2<f64>,
    scores: &Array2<f64>,
) -> Diagnostics {
    let unit_norm_dev = loadings
        .rows()
        .into_iter()
        .map(|row| (row.dot(&row).sqrt() - 1.0).abs())
        .fold(0.0f64, f64::max);

    let recentered = matrix - mean;
    let reconstructed = recentered.dot(&loadings.t());
    let reconstruction_dev = (&reconstructed - scores)
        .iter()
        .map(|d| d.abs())
        .fold(0.0f64, f64::max);

    let gram = loadings.dot(&loadings.t());
    let mut orthogonality_dev = 0.0f64;
    for (i, row) in gram.rows().into_iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            if i != j {
                orthogonality_dev = orthogonality_dev.max(value.abs());
            }
        }
    }

    Diagnostics {
        unit_norm: CheckOutcome {
            max_deviation: unit_norm_dev,
            tolerance: UNIT_NORM_TOLERANCE,
        },
        reconstruction: CheckOutcome {
            max_deviation: reconstruction_dev,
            tolerance: RECONSTRUCTION_TOLERANCE,
        },
        orthogonality: CheckOutcome {
            max_deviation: orthogonality_dev,
            tolerance: ORTHOGONALITY_TOLERANCE,
        },
    }
}
