//! Scatter-plot description and rendering seam.
//!
//! The pipeline describes the plot — points, colors, axis labels, projection —
//! and hands it to a [`Render`] implementation. The crate ships a terminal
//! renderer; raster output (the `_2D.png` / `_3D.png` / `_legend.png`
//! artifacts named by [`figure_paths`]) is the business of external renderers.

use std::path::{Path, PathBuf};

use crate::error::PlotError;
use crate::pca::PcaResult;
use crate::table::Rgb;

/// Projection dimensionality, selected by a CLI flag rather than modeled as
/// a renderer hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    TwoD,
    ThreeD,
}

impl Projection {
    pub fn axes(self) -> usize {
        match self {
            Self::TwoD => 2,
            Self::ThreeD => 3,
        }
    }

    fn figure_tag(self) -> &'static str {
        match self {
            Self::TwoD => "_2D",
            Self::ThreeD => "_3D",
        }
    }
}

/// One sample in component space.
#[derive(Debug, Clone)]
pub struct PlotPoint {
    pub label: String,
    pub color: Rgb,
    /// 2 or 3 coordinates, matching the plot's projection.
    pub coords: Vec<f64>,
}

/// Everything a renderer needs to draw the projection and its legend.
#[derive(Debug, Clone)]
pub struct ScatterPlot {
    pub projection: Projection,
    pub points: Vec<PlotPoint>,
    /// `PC1 (34 %)` style labels, one per axis.
    pub axis_labels: Vec<String>,
}

impl ScatterPlot {
    /// Builds the plot description from the decomposition output.
    ///
    /// Takes the first 2 or 3 score columns and rounds the matching
    /// explained-variance percentages to `decimals` for the axis labels.
    pub fn from_result(
        result: &PcaResult,
        labels: &[String],
        colors: &[Rgb],
        projection: Projection,
        decimals: usize,
    ) -> Result<Self, PlotError> {
        let axes = projection.axes();
        if result.n_components() < axes {
            return Err(PlotError::TooFewComponents {
                k: result.n_components(),
            });
        }

        let axis_labels = (0..axes)
            .map(|i| {
                let pct = 100.0 * result.explained_variance_ratio()[i];
                format!("PC{} ({:.*} %)", i + 1, decimals, pct)
            })
            .collect();

        let scores = result.scores();
        let points = labels
            .iter()
            .zip(colors)
            .enumerate()
            .map(|(row, (label, &color))| PlotPoint {
                label: label.clone(),
                color,
                coords: (0..axes).map(|a| scores[[row, a]]).collect(),
            })
            .collect();

        Ok(Self {
            projection,
            points,
            axis_labels,
        })
    }
}

/// Canonical raster artifact paths for a figure: `<base>_2D.png` (or `_3D`)
/// and the matching `_legend.png` alongside it.
pub fn figure_paths(input: &Path, base: &str, projection: Projection) -> (PathBuf, PathBuf) {
    let tag = projection.figure_tag();
    (
        input.with_file_name(format!("{}{}.png", base, tag)),
        input.with_file_name(format!("{}{}_legend.png", base, tag)),
    )
}

/// A scatter-plot renderer. Implementations decide where the drawing goes:
/// a terminal, an image file, a GUI window.
pub trait Render {
    fn render(&self, plot: &ScatterPlot) -> Result<(), PlotError>;
}

/// Renders the projection as a character grid on stdout, one letter per
/// sample, with a legend mapping letters back to labels, colors, and
/// coordinates. 3D plots are drawn as the PC1/PC2 plane with PC3 listed in
/// the legend.
pub struct TextRenderer {
    pub width: usize,
    pub height: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            width: 60,
            height: 20,
        }
    }
}

impl TextRenderer {
    fn draw(&self, plot: &ScatterPlot) -> String {
        let mut out = String::new();

        let xs: Vec<f64> = plot.points.iter().map(|p| p.coords[0]).collect();
        let ys: Vec<f64> = plot.points.iter().map(|p| p.coords[1]).collect();
        let (x_min, x_max) = span(&xs);
        let (y_min, y_max) = span(&ys);

        let mut grid = vec![vec![' '; self.width]; self.height];
        for (idx, point) in plot.points.iter().enumerate() {
            let col = scale(point.coords[0], x_min, x_max, self.width);
            let row = scale(point.coords[1], y_min, y_max, self.height);
            // Flip so larger y is higher on screen.
            grid[self.height - 1 - row][col] = marker(idx);
        }

        out.push_str(&format!(
            "\n{} vs {}\n",
            plot.axis_labels[0], plot.axis_labels[1]
        ));
        let border = "-".repeat(self.width + 2);
        out.push_str(&border);
        out.push('\n');
        for line in &grid {
            out.push('|');
            out.extend(line.iter());
            out.push_str("|\n");
        }
        out.push_str(&border);
        out.push('\n');

        out.push_str("\nLegend\n");
        for (idx, point) in plot.points.iter().enumerate() {
            let coords = point
                .coords
                .iter()
                .map(|c| format!("{:.3}", c))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "  {}  {}  color {}  ({})\n",
                marker(idx),
                point.label,
                point.color.to_annotation(),
                coords
            ));
        }
        if plot.projection == Projection::ThreeD {
            out.push_str(&format!("  third axis: {}\n", plot.axis_labels[2]));
        }
        out
    }
}

impl Render for TextRenderer {
    fn render(&self, plot: &ScatterPlot) -> Result<(), PlotError> {
        print!("{}", self.draw(plot));
        Ok(())
    }
}

fn span(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

fn scale(value: f64, min: f64, max: f64, cells: usize) -> usize {
    let range = max - min;
    if range <= 0.0 {
        return cells / 2;
    }
    let normalized = (value - min) / range;
    ((normalized * (cells - 1) as f64).round() as usize).min(cells - 1)
}

fn marker(idx: usize) -> char {
    const MARKERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    MARKERS[idx % MARKERS.len()] as char
}
