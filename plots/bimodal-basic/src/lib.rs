use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use common::{
    plot::{ChartSeries, LineChart, Plot, render_line_chart},
    sweep::{BimodalSweep, Predictor, SweepResults},
};
use eyre::{ContextCompat, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Misprediction rate against index bits, one chart per benchmark
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BimodalBasic {
    /// Fixed y axis per benchmark, ie. `jpeg: [7.5, 8.0]`
    #[serde(default)]
    pub y_range: BTreeMap<String, (f64, f64)>,
}

pub fn plot_filename(benchmark: &str) -> String {
    format!("{benchmark}_bimodal_predictor_plot.png")
}

impl BimodalBasic {
    pub fn charts(&self, sweep: &BimodalSweep, plot_dir: &Path) -> Vec<LineChart> {
        sweep
            .benchmarks
            .iter()
            .map(|series| LineChart {
                filepath: plot_dir.join(plot_filename(&series.benchmark)),
                title: format!(
                    "{} Benchmark: Bimodal Predictor",
                    series.benchmark.to_uppercase()
                ),
                x_label: "m (Number of PC bits used)".to_owned(),
                y_label: "Misprediction Rate (%)".to_owned(),
                x_ticks: sweep.m_values.clone(),
                y_range: self.y_range.get(&series.benchmark).copied(),
                legend_title: None,
                series: vec![ChartSeries::with_gaps(None, &sweep.m_values, &series.rates)],
            })
            .collect()
    }
}

#[typetag::serde]
impl Plot for BimodalBasic {
    fn required_sweeps(&self) -> &'static [Predictor] {
        &[Predictor::Bimodal]
    }

    fn plot(&self, results: &SweepResults, plot_dir: &Path) -> Result<Vec<PathBuf>> {
        let sweep = results
            .bimodal
            .as_ref()
            .context("Bimodal sweep was not aggregated")?;

        let mut written = Vec::new();
        for chart in self.charts(sweep, plot_dir) {
            debug!("Plotting {}", chart.filepath.display());
            render_line_chart(&chart)?;
            written.push(chart.filepath);
        }
        Ok(written)
    }
}
