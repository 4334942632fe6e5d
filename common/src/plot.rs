use core::fmt::Debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Context, ContextCompat, Result, bail, eyre};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::fs::create_dir_all;
use tracing::debug;

use crate::sweep::{Predictor, SweepResults};

const TITLE_FONT_SIZE: u32 = 28;
const AXIS_LABEL_FONT_SIZE: u32 = 20;
const TICK_LABEL_FONT_SIZE: u32 = 16;
const LEGEND_FONT_SIZE: u32 = 16;

#[typetag::serde(tag = "type")]
pub trait Plot: Debug + DynClone + Send + Sync {
    /// The sweeps this plot reads from [`SweepResults`]
    fn required_sweeps(&self) -> &'static [Predictor];
    /// Renders the charts
    ///
    /// Arguments:
    /// * `results` - Aggregated sweeps, holding at least [`Plot::required_sweeps`]
    /// * `plot_dir` - Directory the images land in
    ///
    /// Returns the paths of the images written.
    fn plot(&self, results: &SweepResults, plot_dir: &Path) -> Result<Vec<PathBuf>>;
}
clone_trait_object!(Plot);

/// One line on a chart. Each segment is drawn as its own polyline, so a gap between segments
/// shows up as a break in the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: Option<String>,
    pub segments: Vec<Vec<(f64, f64)>>,
}

impl ChartSeries {
    /// Splits positionally aligned values into segments at every `None`
    pub fn with_gaps(label: Option<String>, xs: &[u32], ys: &[Option<f64>]) -> Self {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (x, y) in xs.iter().zip(ys) {
            match y {
                Some(y) => current.push((*x as f64, *y)),
                None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        Self { label, segments }
    }

    pub fn points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.segments.iter().flatten()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineChart {
    pub filepath: PathBuf,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_ticks: Vec<u32>,
    /// Fixed y axis, otherwise 0 up to a little above the largest value
    pub y_range: Option<(f64, f64)>,
    /// Heading shown above the legend entries
    pub legend_title: Option<String>,
    pub series: Vec<ChartSeries>,
}

impl LineChart {
    pub fn y_bounds(&self) -> (f64, f64) {
        if let Some(range) = self.y_range {
            return range;
        }
        let max = self
            .series
            .iter()
            .flat_map(ChartSeries::points)
            .map(|(_, y)| *y)
            .fold(0.0_f64, f64::max);
        (0.0, if max > 0.0 { max * 1.1 } else { 1.0 })
    }

    pub fn x_key_points(&self) -> Vec<f64> {
        self.x_ticks.iter().map(|t| *t as f64).collect()
    }

    pub fn x_bounds(&self) -> (f64, f64) {
        match (self.x_ticks.first(), self.x_ticks.last()) {
            (Some(first), Some(last)) if first < last => (*first as f64, *last as f64),
            (Some(only), _) => (*only as f64 - 1.0, *only as f64 + 1.0),
            _ => (0.0, 1.0),
        }
    }
}

pub async fn ensure_plot_dirs(dirs: &[PathBuf]) -> Result<()> {
    for dir in dirs {
        create_dir_all(dir)
            .await
            .context(format!("Create plot dir {}", dir.display()))?;
    }
    Ok(())
}

fn write_plot_data(chart: &LineChart) -> Result<()> {
    let parent = chart
        .filepath
        .parent()
        .context("Plot path has no parent directory")?;
    let plot_data_dir = parent.join("plot_data");
    if !plot_data_dir.exists() {
        fs::create_dir_all(&plot_data_dir)?;
    }
    let stem = chart
        .filepath
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| eyre!("Invalid filepath for chart: {:?}", chart.filepath))?;
    fs::write(
        plot_data_dir.join(format!("{stem}.json")),
        serde_json::to_string(&chart.series)?,
    )?;
    Ok(())
}

const COLORS: &[RGBColor] = &[
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

/// Delegates to `WithKeyPoints` but opts into default value formatting, which
/// plotters requires for `configure_mesh`; labels come from `x_label_formatter`.
struct KeyPointsAxis(
    plotters::coord::combinators::WithKeyPoints<plotters::coord::types::RangedCoordf64>,
);

impl Ranged for KeyPointsAxis {
    type FormatOption = plotters::coord::ranged1d::DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.0.map(value, limit)
    }

    fn key_points<Hint: plotters::coord::ranged1d::KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        self.0.key_points(hint)
    }

    fn range(&self) -> std::ops::Range<f64> {
        self.0.range()
    }

    fn axis_pixel_range(&self, limit: (i32, i32)) -> std::ops::Range<i32> {
        self.0.axis_pixel_range(limit)
    }
}

/// Draws a line chart with point markers to a PNG
pub fn render_line_chart(chart: &LineChart) -> Result<()> {
    if let Some(parent) = chart.filepath.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    let (x_min, x_max) = chart.x_bounds();
    let (y_min, y_max) = chart.y_bounds();
    if !y_min.is_finite() || !y_max.is_finite() || y_min >= y_max {
        bail!("Unusable y range {y_min}..{y_max} for {}", chart.title);
    }
    write_plot_data(chart)?;

    let root = BitMapBackend::new(&chart.filepath, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            KeyPointsAxis((x_min..x_max).with_key_points(chart.x_key_points())),
            y_min..y_max,
        )?;

    ctx.configure_mesh()
        .x_labels(chart.x_ticks.len().max(2))
        .x_label_formatter(&|x| format!("{}", x.round() as i64))
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    let mut labelled = false;
    if let Some(title) = &chart.legend_title
        && chart.series.iter().any(|s| s.label.is_some())
    {
        ctx.draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())?
            .label(title.as_str())
            .legend(|(x, y)| EmptyElement::at((x, y)));
    }
    for (i, series) in chart.series.iter().enumerate() {
        let color = COLORS[i % COLORS.len()];
        for (j, segment) in series.segments.iter().enumerate() {
            let drawn = ctx.draw_series(LineSeries::new(
                segment.clone(),
                color.stroke_width(2),
            ))?;
            if j == 0
                && let Some(label) = &series.label
            {
                labelled = true;
                drawn.label(label.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
            ctx.draw_series(PointSeries::of_element(
                segment.clone(),
                4,
                color.filled(),
                &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
            ))?;
        }
    }

    if labelled {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", LEGEND_FONT_SIZE))
            .draw()?;
    }

    root.present()
        .context(format!("Write {}", chart.filepath.display()))?;
    debug!("Rendered {}", chart.filepath.display());
    Ok(())
}

pub async fn plot(
    plots: &Option<Vec<Box<dyn Plot>>>,
    results: &SweepResults,
    plot_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let Some(plots) = plots else {
        debug!("No plots");
        return Ok(Vec::new());
    };

    ensure_plot_dirs(&[plot_dir.to_path_buf()]).await?;
    let mut written = Vec::new();
    for plot in plots {
        if let Some(missing) = plot.required_sweeps().iter().find(|p| !results.has(**p)) {
            bail!("{plot:?} needs the {} sweep", missing.name());
        }
        written.extend(plot.plot(results, plot_dir)?);
    }
    Ok(written)
}
