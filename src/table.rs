//! Input table model.
//!
//! The expected layout is comma-separated text: the first column holds the
//! sample label, one column named `color` holds an `R:G:B` annotation with
//! integer channels in 0..=255, and every remaining column is a numeric
//! feature named by the header row.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use log::debug;
use ndarray::Array2;

use crate::error::InputError;

/// Per-sample color annotation with channels normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    /// Re-encodes the color as the `R:G:B` annotation it was parsed from.
    pub fn to_annotation(self) -> String {
        format!(
            "{}:{}:{}",
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8
        )
    }
}

/// Decodes an `R:G:B` annotation into channel values in [0, 1].
///
/// Exactly three colon-separated integer tokens in 0..=255 are accepted;
/// anything else is an [`InputError::InvalidColorFormat`].
pub fn parse_color(value: &str) -> Result<Rgb, InputError> {
    let invalid = || InputError::InvalidColorFormat {
        value: value.to_string(),
    };
    let tokens: Vec<&str> = value.split(':').collect();
    if tokens.len() != 3 {
        return Err(invalid());
    }
    let mut channels = [0.0f64; 3];
    for (slot, token) in channels.iter_mut().zip(&tokens) {
        let byte: u8 = token.trim().parse().map_err(|_| invalid())?;
        *slot = f64::from(byte) / 255.0;
    }
    Ok(Rgb {
        r: channels[0],
        g: channels[1],
        b: channels[2],
    })
}

/// An immutable tabular dataset: N samples by P features, with order-aligned
/// sample labels, feature names, and per-sample colors.
#[derive(Debug, Clone)]
pub struct DataTable {
    index_name: String,
    labels: Vec<String>,
    feature_names: Vec<String>,
    colors: Vec<Rgb>,
    matrix: Array2<f64>,
}

impl DataTable {
    /// Reads a table from a comma-separated file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_reader(BufReader::new(file))?;
        debug!(
            "read table from {}: {} samples x {} features",
            path.as_ref().display(),
            table.n_samples(),
            table.n_features()
        );
        Ok(table)
    }

    /// Reads a table from any CSV source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, InputError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(InputError::Empty);
        }

        // The first header names the index column; `color` may sit anywhere
        // among the rest. Everything else is a feature.
        let color_idx = headers
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, name)| *name == "color")
            .map(|(idx, _)| idx)
            .ok_or(InputError::MissingColorColumn)?;

        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(idx, _)| *idx != color_idx)
            .map(|(_, name)| name.to_string())
            .collect();
        let n_features = feature_names.len();

        let mut labels = Vec::new();
        let mut colors = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        for (row_num, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(InputError::RaggedRow {
                    row: row_num,
                    expected: headers.len(),
                    found: record.len(),
                });
            }

            labels.push(record[0].to_string());
            colors.push(parse_color(&record[color_idx])?);

            let mut feature_pos = 0usize;
            for (col_idx, cell) in record.iter().enumerate().skip(1) {
                if col_idx == color_idx {
                    continue;
                }
                let parsed: f64 =
                    cell.trim()
                        .parse()
                        .map_err(|_| InputError::NonNumericCell {
                            row: row_num,
                            feature: feature_names[feature_pos].clone(),
                            value: cell.to_string(),
                        })?;
                values.push(parsed);
                feature_pos += 1;
            }
        }

        if labels.is_empty() {
            return Err(InputError::Empty);
        }

        let matrix = Array2::from_shape_vec((labels.len(), n_features), values)
            .expect("row length verified per record");

        Ok(Self {
            index_name: headers[0].to_string(),
            labels,
            feature_names,
            colors,
            matrix,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Re-serializes the table (labels, colors, features) as CSV text, used
    /// verbatim in the persisted report.
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.index_name);
        out.push_str(",color");
        for name in &self.feature_names {
            out.push(',');
            out.push_str(name);
        }
        out.push('\n');
        for (row_idx, label) in self.labels.iter().enumerate() {
            out.push_str(label);
            out.push(',');
            out.push_str(&self.colors[row_idx].to_annotation());
            for value in self.matrix.row(row_idx) {
                out.push(',');
                out.push_str(&value.to_string());
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE_CSV: &str = "\
name,color,height,weight,age
alpha,255:0:0,1.0,2.0,3.0
beta,0:128:255,4.0,5.0,6.0
gamma,0:255:0,7.0,8.0,9.0
";

    #[test]
    fn parse_color_pure_red() {
        let rgb = parse_color("255:0:0").unwrap();
        assert_eq!(rgb, Rgb { r: 1.0, g: 0.0, b: 0.0 });
    }

    #[test]
    fn parse_color_mixed() {
        let rgb = parse_color("0:128:255").unwrap();
        assert_abs_diff_eq!(rgb.r, 0.0);
        assert_abs_diff_eq!(rgb.g, 128.0 / 255.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rgb.b, 1.0);
    }

    #[test]
    fn parse_color_rejects_malformed() {
        for bad in ["255:0", "1:2:3:4", "a:b:c", "256:0:0", "-1:0:0", ""] {
            assert!(
                matches!(
                    parse_color(bad),
                    Err(InputError::InvalidColorFormat { .. })
                ),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn color_annotation_round_trips() {
        let rgb = parse_color("12:200:255").unwrap();
        assert_eq!(rgb.to_annotation(), "12:200:255");
    }

    #[test]
    fn reads_well_formed_table() {
        let table = DataTable::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(table.n_samples(), 3);
        assert_eq!(table.n_features(), 3);
        assert_eq!(table.labels(), &["alpha", "beta", "gamma"]);
        assert_eq!(table.feature_names(), &["height", "weight", "age"]);
        assert_eq!(table.matrix()[[1, 2]], 6.0);
        assert_eq!(table.colors()[0], Rgb { r: 1.0, g: 0.0, b: 0.0 });
    }

    #[test]
    fn color_column_may_sit_anywhere() {
        let csv = "name,height,color,weight\na,1.0,255:0:0,2.0\nb,3.0,0:0:255,4.0\n";
        let table = DataTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.feature_names(), &["height", "weight"]);
        assert_eq!(table.matrix()[[0, 1]], 2.0);
    }

    #[test]
    fn missing_color_column_is_fatal() {
        let csv = "name,height,weight\na,1.0,2.0\n";
        assert!(matches!(
            DataTable::from_reader(csv.as_bytes()),
            Err(InputError::MissingColorColumn)
        ));
    }

    #[test]
    fn ragged_row_identifies_offender() {
        let csv = "name,color,height,weight\na,255:0:0,1.0,2.0\nb,0:0:255,3.0\n";
        match DataTable::from_reader(csv.as_bytes()) {
            Err(InputError::RaggedRow { row, expected, found }) => {
                assert_eq!(row, 1);
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            }
            other => panic!("expected RaggedRow, got {:?}", other),
        }
    }

    #[test]
    fn non_numeric_cell_identifies_feature() {
        let csv = "name,color,height,weight\na,255:0:0,1.0,heavy\n";
        match DataTable::from_reader(csv.as_bytes()) {
            Err(InputError::NonNumericCell { row, feature, value }) => {
                assert_eq!(row, 0);
                assert_eq!(feature, "weight");
                assert_eq!(value, "heavy");
            }
            other => panic!("expected NonNumericCell, got {:?}", other),
        }
    }

    #[test]
    fn empty_table_is_fatal() {
        let csv = "name,color,height\n";
        assert!(matches!(
            DataTable::from_reader(csv.as_bytes()),
            Err(InputError::Empty)
        ));
    }

    #[test]
    fn table_round_trips_through_csv_text() {
        let table = DataTable::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        let rendered = table.to_csv_string();
        let reparsed = DataTable::from_reader(rendered.as_bytes()).unwrap();
        assert_eq!(reparsed.labels(), table.labels());
        assert_eq!(reparsed.matrix(), table.matrix());
    }
}
