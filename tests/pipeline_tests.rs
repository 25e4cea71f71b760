// End-to-end pipeline tests: CSV in, report artifacts and projection out.

use std::fs;
use std::io::Write;

use approx::assert_abs_diff_eq;
use pca_analysis::plot::{Projection, ScatterPlot};
use pca_analysis::preprocess::Transform;
use pca_analysis::report::Report;
use pca_analysis::table::DataTable;

const CSV: &str = "\
sample,color,x,y
a,255:0:0,3.0,0.0
b,0:255:0,-3.0,0.0
c,0:0:255,0.0,1.0
d,255:255:0,0.0,-1.0
";

#[test]
fn csv_to_known_decomposition() {
    // X^T X = diag(18, 2) on mean-free data: eigenvalues 6 and 2/3,
    // ratios 0.9 and 0.1, scores on the coordinate axes up to sign.
    let table = DataTable::from_reader(CSV.as_bytes()).unwrap();
    let result = pca_analysis::compute(table.matrix()).unwrap();

    assert_abs_diff_eq!(result.explained_variance_ratio()[0], 0.9, epsilon = 1e-6);
    assert_abs_diff_eq!(result.explained_variance_ratio()[1], 0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(result.scores()[[0, 0]].abs(), 3.0, epsilon = 1e-8);
    assert_abs_diff_eq!(result.scores()[[2, 1]].abs(), 1.0, epsilon = 1e-8);
    assert!(result.diagnostics().all_passed());
}

#[test]
fn full_run_persists_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("run.csv");
    let mut file = fs::File::create(&input).unwrap();
    file.write_all(CSV.as_bytes()).unwrap();
    drop(file);

    let table = DataTable::from_csv_path(&input).unwrap();
    let transform = Transform::None;
    let transformed = transform.apply(table.matrix(), table.feature_names()).unwrap();
    let result = pca_analysis::compute(&transformed).unwrap();

    let report = Report::new(&table, &transformed, &result, transform, 2);
    report.save(&input).unwrap();

    let loadings = fs::read_to_string(dir.path().join("run_loadings.csv")).unwrap();
    assert!(loadings.starts_with(",x,y"));
    assert_eq!(loadings.lines().count(), 3);

    let info = fs::read_to_string(dir.path().join("run_info.txt")).unwrap();
    assert!(info.contains("## Data table ##"));
    assert!(info.contains("PC1 = 90.000000 %"));
    assert!(info.contains("PC2 = 10.000000 %"));
    assert!(info.contains("## Loadings ##"));

    let plot = ScatterPlot::from_result(
        &result,
        table.labels(),
        table.colors(),
        Projection::TwoD,
        0,
    )
    .unwrap();
    assert_eq!(plot.points.len(), 4);
    assert_eq!(plot.axis_labels, vec!["PC1 (90 %)", "PC2 (10 %)"]);
}

#[test]
fn standardized_run_uses_suffixed_artifacts() {
    let csv = "\
sample,color,x,y,z
a,255:0:0,1.0,10.0,100.0
b,0:255:0,2.0,30.0,90.0
c,0:0:255,3.0,20.0,120.0
d,255:255:0,4.0,40.0,80.0
";
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("run.csv");
    fs::write(&input, csv).unwrap();

    let table = DataTable::from_csv_path(&input).unwrap();
    let transform = Transform::Standardize;
    let transformed = transform.apply(table.matrix(), table.feature_names()).unwrap();
    let result = pca_analysis::compute(&transformed).unwrap();

    Report::new(&table, &transformed, &result, transform, 0)
        .save(&input)
        .unwrap();

    assert!(dir.path().join("run-std_loadings.csv").exists());
    assert!(dir.path().join("run-std_info.txt").exists());
    assert!(!dir.path().join("run_loadings.csv").exists());

    // Ratios still sum to one after standardization.
    assert_abs_diff_eq!(result.explained_variance_ratio().sum(), 1.0, epsilon = 1e-6);
}

#[test]
fn log_transformed_pipeline_rejects_non_positive_data() {
    let csv = "\
sample,color,x,y
a,255:0:0,1.0,2.0
b,0:255:0,0.0,3.0
";
    let table = DataTable::from_reader(csv.as_bytes()).unwrap();
    let err = Transform::Log
        .apply(table.matrix(), table.feature_names())
        .unwrap_err();
    assert!(err.to_string().contains("non-positive"));
}

#[test]
fn three_d_projection_from_three_features() {
    let csv = "\
sample,color,x,y,z
a,255:0:0,1.0,0.0,0.5
b,0:255:0,-1.0,2.0,0.0
c,0:0:255,0.5,-2.0,1.0
d,255:255:0,-0.5,0.0,-1.5
";
    let table = DataTable::from_reader(csv.as_bytes()).unwrap();
    let result = pca_analysis::compute(table.matrix()).unwrap();
    let plot = ScatterPlot::from_result(
        &result,
        table.labels(),
        table.colors(),
        Projection::ThreeD,
        1,
    )
    .unwrap();
    assert_eq!(plot.axis_labels.len(), 3);
    assert_eq!(plot.points[0].coords.len(), 3);
}
