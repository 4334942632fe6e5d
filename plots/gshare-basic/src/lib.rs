use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use common::{
    plot::{ChartSeries, LineChart, Plot, render_line_chart},
    sweep::{GshareSweep, Predictor, SweepResults},
};
use eyre::{ContextCompat, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Misprediction rate against index bits with one line per history length
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GshareBasic {
    #[serde(default)]
    pub y_range: BTreeMap<String, (f64, f64)>,
}

pub fn plot_filename(benchmark: &str) -> String {
    format!("{benchmark}_gshare_predictor_plot.png")
}

impl GshareBasic {
    pub fn charts(&self, sweep: &GshareSweep, plot_dir: &Path) -> Vec<LineChart> {
        sweep
            .benchmarks
            .iter()
            .map(|series| LineChart {
                filepath: plot_dir.join(plot_filename(&series.benchmark)),
                title: format!(
                    "{} Benchmark: Gshare Predictor",
                    series.benchmark.to_uppercase()
                ),
                x_label: "m (PC bits used)".to_owned(),
                y_label: "Misprediction Rate (%)".to_owned(),
                x_ticks: sweep.m_values.clone(),
                y_range: self.y_range.get(&series.benchmark).copied(),
                legend_title: Some("n (History bits)".to_owned()),
                series: series
                    .by_history
                    .iter()
                    .filter(|(_, points)| !points.is_empty())
                    .map(|(n, points)| ChartSeries {
                        label: Some(format!("n={n}")),
                        segments: vec![points.iter().map(|(m, r)| (*m as f64, *r)).collect()],
                    })
                    .collect(),
            })
            .collect()
    }
}

#[typetag::serde]
impl Plot for GshareBasic {
    fn required_sweeps(&self) -> &'static [Predictor] {
        &[Predictor::Gshare]
    }

    fn plot(&self, results: &SweepResults, plot_dir: &Path) -> Result<Vec<PathBuf>> {
        let sweep = results
            .gshare
            .as_ref()
            .context("Gshare sweep was not aggregated")?;

        let mut written = Vec::new();
        for chart in self.charts(sweep, plot_dir) {
            debug!(
                "Plotting {} with {} history lines",
                chart.filepath.display(),
                chart.series.len()
            );
            render_line_chart(&chart)?;
            written.push(chart.filepath);
        }
        Ok(written)
    }
}
