// Principal component analysis of tabular data

#![doc = include_str!("../README.md")]

pub mod error;
pub mod pca;
pub mod plot;
pub mod preprocess;
pub mod report;
pub mod table;

pub use error::{InputError, PcaError, PlotError, PreprocessError};
pub use pca::{compute, CheckOutcome, Diagnostics, PcaResult};
pub use plot::{Projection, Render, ScatterPlot, TextRenderer};
pub use preprocess::Transform;
pub use report::Report;
pub use table::{parse_color, DataTable, Rgb};
