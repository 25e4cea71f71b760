// pca-analysis command-line front end

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use pca_analysis::plot::{self, Projection, Render, ScatterPlot, TextRenderer};
use pca_analysis::preprocess::Transform;
use pca_analysis::report::{base_name, Report};
use pca_analysis::table::DataTable;

/// Calculate PCA from data stored in a .csv file and display it as a 2D
/// (optionally 3D) projection.
#[derive(Parser, Debug)]
#[command(name = "pca-analysis", version, about)]
struct CliArgs {
    /// Path of the .csv file: each line is a sample, the first value its
    /// name, followed by a color annotation and its features.
    csv_path: PathBuf,

    /// Decimals at which principal component percentages are rounded on
    /// screen and on plot axes.
    #[arg(long, default_value_t = 0)]
    rounded: usize,

    /// Project onto the first three components instead of two.
    #[arg(long = "proj3d")]
    proj3d: bool,

    /// Persist report artifacts instead of only displaying them.
    #[arg(long = "save")]
    save: bool,

    /// Standardize the features to zero mean and unit variance.
    #[arg(long = "std", conflicts_with = "log")]
    std: bool,

    /// Apply a natural log transform to the features.
    #[arg(long = "log")]
    log: bool,

    /// Log level filter (error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let log_level = args
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or_else(|_| {
            eprintln!(
                "Warning: invalid log level '{}', defaulting to warn.",
                args.log_level
            );
            log::LevelFilter::Warn
        });
    env_logger::Builder::new().filter_level(log_level).init();

    run(args)
}

fn run(args: CliArgs) -> Result<()> {
    let table = DataTable::from_csv_path(&args.csv_path)
        .with_context(|| format!("failed to read table {}", args.csv_path.display()))?;
    info!(
        "loaded {} samples with {} features",
        table.n_samples(),
        table.n_features()
    );

    let transform = Transform::from_flags(args.std, args.log)?;
    let transformed = transform.apply(table.matrix(), table.feature_names())?;

    let result = pca_analysis::compute(&transformed).context("PCA computation failed")?;
    info!(
        "decomposed into {} components; checks passed: {}",
        result.n_components(),
        result.diagnostics().all_passed()
    );

    let report = Report::new(&table, &transformed, &result, transform, args.rounded);
    print!("{}", report.render());

    if args.save {
        report.save(&args.csv_path).context("failed to persist report artifacts")?;
    }

    let projection = if args.proj3d {
        Projection::ThreeD
    } else {
        Projection::TwoD
    };
    let scatter = ScatterPlot::from_result(
        &result,
        table.labels(),
        table.colors(),
        projection,
        args.rounded,
    )?;

    if args.save {
        let base = base_name(&args.csv_path, transform);
        let (figure, legend) = plot::figure_paths(&args.csv_path, &base, projection);
        warn!(
            "figure export requires an external renderer; expected artifacts: {} and {}",
            figure.display(),
            legend.display()
        );
    } else {
        TextRenderer::default().render(&scatter)?;
    }

    Ok(())
}
