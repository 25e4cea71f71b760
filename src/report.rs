//! Report assembly and persistence.
//!
//! The report mirrors the terminal layout of the analysis: the original data
//! table, the (possibly transformed) matrix, one line per principal component
//! with its explained-variance percentage, and the loadings table keyed by
//! component and feature name.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::Array2;
use tempfile::NamedTempFile;

use crate::error::PcaError;
use crate::pca::PcaResult;
use crate::preprocess::Transform;
use crate::table::DataTable;

/// Decimal places used for percentages in the persisted report.
const PERSISTED_DECIMALS: usize = 6;

/// Names the components `PC1`..`PCk`.
pub fn component_names(k: usize) -> Vec<String> {
    (1..=k).map(|i| format!("PC{}", i)).collect()
}

/// A formatted view over one analysis run.
pub struct Report<'a> {
    table: &'a DataTable,
    transformed: &'a Array2<f64>,
    result: &'a PcaResult,
    transform: Transform,
    decimals: usize,
}

impl<'a> Report<'a> {
    /// `decimals` controls percentage rounding in the on-screen summary;
    /// the persisted report always uses six decimals.
    pub fn new(
        table: &'a DataTable,
        transformed: &'a Array2<f64>,
        result: &'a PcaResult,
        transform: Transform,
        decimals: usize,
    ) -> Self {
        Self {
            table,
            transformed,
            result,
            transform,
            decimals,
        }
    }

    /// `PCi = <percentage> %` lines, one per component.
    pub fn percentage_lines(&self, decimals: usize) -> Vec<String> {
        self.result
            .explained_variance_ratio()
            .iter()
            .enumerate()
            .map(|(i, ratio)| format!("PC{} = {:.*} %", i + 1, decimals, 100.0 * ratio))
            .collect()
    }

    /// The loadings table as CSV text: components as rows labeled `PC1..PCk`,
    /// features as columns.
    pub fn loadings_csv(&self) -> Result<String, PcaError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec![String::new()];
        header.extend(self.table.feature_names().iter().cloned());
        writer
            .write_record(&header)
            .map_err(|e| PcaError::Internal(format!("failed to encode loadings: {}", e)))?;

        let names = component_names(self.result.n_components());
        for (name, row) in names.iter().zip(self.result.loadings().rows()) {
            let mut record = vec![name.clone()];
            record.extend(row.iter().map(|v| v.to_string()));
            writer
                .write_record(&record)
                .map_err(|e| PcaError::Internal(format!("failed to encode loadings: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| PcaError::Internal(format!("failed to encode loadings: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| PcaError::Internal(e.to_string()))
    }

    /// The full on-screen report.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("\n## Data table ##\n\n");
        out.push_str(&self.table.to_csv_string());

        out.push_str("\n## Transformed data ##\n\n");
        if let Some(label) = self.transform.label() {
            out.push_str(label);
            out.push('\n');
        }
        out.push_str(&render_matrix(
            self.transformed,
            self.table.labels(),
            self.table.feature_names(),
        ));

        out.push_str("\n## Principal Components ##\n\n");
        for line in self.percentage_lines(self.decimals) {
            out.push_str(&line);
            out.push('\n');
        }

        out.push_str("\n## Loadings ##\n\n");
        match self.loadings_csv() {
            Ok(csv_text) => out.push_str(&csv_text),
            Err(_) => out.push_str("(loadings unavailable)\n"),
        }

        out
    }

    /// The persisted `_info.txt` content: original table, component
    /// percentages at six decimals, loadings table.
    pub fn info_text(&self) -> Result<String, PcaError> {
        let mut out = String::new();
        out.push_str("\n## Data table ##\n");
        out.push_str(&self.table.to_csv_string());
        out.push_str("\n## Principal Components ##\n");
        for line in self.percentage_lines(PERSISTED_DECIMALS) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("\n## Loadings ##\n");
        out.push_str(&self.loadings_csv()?);
        Ok(out)
    }

    /// Derived artifact paths for a given input path, transform suffix
    /// applied: `<stem><suffix>_loadings.csv` and `<stem><suffix>_info.txt`.
    pub fn output_paths(&self, input: &Path) -> (PathBuf, PathBuf) {
        let base = base_name(input, self.transform);
        (
            input.with_file_name(format!("{}_loadings.csv", base)),
            input.with_file_name(format!("{}_info.txt", base)),
        )
    }

    /// Persists the loadings CSV and the combined report, all or nothing.
    ///
    /// Both artifacts are staged as temporary files in the destination
    /// directory and only then moved into place; a failure at any point
    /// leaves no partial file behind.
    pub fn save(&self, input: &Path) -> Result<(), PcaError> {
        let (loadings_path, info_path) = self.output_paths(input);
        let dir = input.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = dir.unwrap_or_else(|| Path::new("."));

        let loadings_text = self.loadings_csv()?;
        let info_text = self.info_text()?;

        let mut staged_loadings = NamedTempFile::new_in(dir)?;
        staged_loadings.write_all(loadings_text.as_bytes())?;
        staged_loadings.flush()?;

        let mut staged_info = NamedTempFile::new_in(dir)?;
        staged_info.write_all(info_text.as_bytes())?;
        staged_info.flush()?;

        staged_loadings
            .persist(&loadings_path)
            .map_err(|e| PcaError::Io(e.error))?;
        if let Err(e) = staged_info.persist(&info_path) {
            // Roll back the first artifact so the pair stays atomic.
            let _ = fs::remove_file(&loadings_path);
            return Err(PcaError::Io(e.error));
        }

        info!(
            "saved report artifacts: {} and {}",
            loadings_path.display(),
            info_path.display()
        );
        Ok(())
    }
}

/// Input basename with the transform suffix spliced in before derived
/// artifact names are built (`data` + `-std` -> `data-std`).
pub fn base_name(input: &Path, transform: Transform) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("{}{}", stem, transform.suffix())
}

fn render_matrix(matrix: &Array2<f64>, labels: &[String], feature_names: &[String]) -> String {
    let mut out = String::new();
    let label_width = labels
        .iter()
        .map(|l| l.len())
        .max()
        .unwrap_or(4)
        .max(4);

    out.push_str(&format!("{:>width$}", "", width = label_width));
    for name in feature_names {
        out.push_str(&format!(" {:>12}", name));
    }
    out.push('\n');

    for (row_idx, label) in labels.iter().enumerate() {
        out.push_str(&format!("{:>width$}", label, width = label_width));
        for value in matrix.row(row_idx) {
            out.push_str(&format!(" {:>12.6}", value));
        }
        out.push('\n');
    }
    out
}
