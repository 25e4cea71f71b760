//! Error taxonomy for the analysis pipeline.
//!
//! Every error here is fatal: all operations are deterministic functions of
//! already-validated input, so nothing is retried and nothing is swallowed.

use thiserror::Error;

/// Errors raised while reading and validating the input table.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("table has no 'color' column")]
    MissingColorColumn,

    #[error("malformed color '{value}': expected 'R:G:B' with integers in 0..=255")]
    InvalidColorFormat { value: String },

    #[error("non-numeric value '{value}' for feature '{feature}' in row {row}")]
    NonNumericCell {
        row: usize,
        feature: String,
        value: String,
    },

    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("table contains no data rows")]
    Empty,

    #[error("failed to read table: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by the optional pre-decomposition transforms.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("feature '{feature}' has zero standard deviation and cannot be standardized")]
    DegenerateFeature { feature: String },

    #[error("log transform undefined: non-positive value for feature '{feature}' in row {row}")]
    NonPositiveValue { feature: String, row: usize },

    #[error("standardization and log transform are mutually exclusive")]
    ConflictingTransforms,
}

/// Errors raised while building or rendering a scatter plot.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("3D projection requires at least 3 components, decomposition yielded {k}")]
    TooFewComponents { k: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Umbrella error for the whole pipeline.
#[derive(Debug, Error)]
pub enum PcaError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("PCA requires at least 2 samples, found {n}")]
    InsufficientSamples { n: usize },

    #[error("PCA requires at least 1 feature")]
    InsufficientFeatures,

    #[error("non-finite value at row {row}, column {col}")]
    NonFiniteValue { row: usize, col: usize },

    #[error("matrix has zero total variance; components are undefined")]
    ZeroVariance,

    #[error("decomposition failed to converge: {0}")]
    NumericalInstability(#[from] ndarray_linalg::error::LinalgError),

    /// An internal invariant of the decomposition did not hold. This is a bug
    /// signal, not a data problem: the result must not be reported.
    #[error(
        "consistency check '{check}' failed: max deviation {max_deviation:e} \
         exceeds tolerance {tolerance:e}"
    )]
    Consistency {
        check: &'static str,
        max_deviation: f64,
        tolerance: f64,
    },

    #[error("model persistence failed: {0}")]
    Model(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
