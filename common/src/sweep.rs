use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    config::SweepRange,
    result::{RateError, RateExtractor},
};

/// The parameter space a run walks over
#[derive(Debug, Clone)]
pub struct SweepSpace {
    pub benchmarks: Vec<String>,
    pub m: SweepRange,
    pub n: SweepRange,
    /// Decides whether an `(m, n)` pair is looked up at all
    pub is_valid: fn(u32, u32) -> bool,
}

/// Gshare history can not be longer than the index it is XORed into
pub fn history_fits(m: u32, n: u32) -> bool {
    n <= m
}

pub fn bimodal_filename(benchmark: &str, m: u32) -> String {
    format!("{benchmark}_m{m}.out")
}

pub fn gshare_filename(benchmark: &str, m: u32, n: u32) -> String {
    format!("{benchmark}_m{m}_n{n}.out")
}

#[derive(Debug, Clone, PartialEq)]
pub struct BimodalSweep {
    pub m_values: Vec<u32>,
    pub benchmarks: Vec<BimodalSeries>,
}

/// Rates for one benchmark, `rates[i]` belongs to `m_values[i]`
#[derive(Debug, Clone, PartialEq)]
pub struct BimodalSeries {
    pub benchmark: String,
    pub rates: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GshareSweep {
    pub m_values: Vec<u32>,
    pub n_values: Vec<u32>,
    pub benchmarks: Vec<GshareSeries>,
}

/// Rates for one benchmark keyed by history length. Only pairs that were valid and parsed are
/// present, so the grid is sparse.
#[derive(Debug, Clone, PartialEq)]
pub struct GshareSeries {
    pub benchmark: String,
    pub by_history: BTreeMap<u32, Vec<(u32, f64)>>,
}

impl BimodalSweep {
    pub fn series(&self, benchmark: &str) -> Option<&BimodalSeries> {
        self.benchmarks.iter().find(|s| s.benchmark == benchmark)
    }
}

impl GshareSweep {
    pub fn series(&self, benchmark: &str) -> Option<&GshareSeries> {
        self.benchmarks.iter().find(|s| s.benchmark == benchmark)
    }
}

impl GshareSeries {
    pub fn history(&self, n: u32) -> &[(u32, f64)] {
        self.by_history.get(&n).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Which aggregated sweep a consumer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predictor {
    Bimodal,
    Gshare,
}

impl Predictor {
    pub fn name(&self) -> &'static str {
        match self {
            Predictor::Bimodal => "bimodal",
            Predictor::Gshare => "gshare",
        }
    }
}

/// Everything aggregated in one run, handed to the plots
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SweepResults {
    pub bimodal: Option<BimodalSweep>,
    pub gshare: Option<GshareSweep>,
}

impl SweepResults {
    pub fn has(&self, predictor: Predictor) -> bool {
        match predictor {
            Predictor::Bimodal => self.bimodal.is_some(),
            Predictor::Gshare => self.gshare.is_some(),
        }
    }
}

/// One result file lookup, handed to the progress callback as soon as it finishes
#[derive(Debug)]
pub struct ReadAttempt<'a> {
    pub benchmark: &'a str,
    pub m: u32,
    pub n: Option<u32>,
    pub path: &'a Path,
    pub outcome: &'a Result<f64, RateError>,
}

impl ReadAttempt<'_> {
    pub fn rate(&self) -> Option<f64> {
        self.outcome.as_ref().ok().copied()
    }
}

async fn read_logged(
    extractor: &RateExtractor,
    path: &Path,
    benchmark: &str,
    m: u32,
    n: Option<u32>,
    progress: &mut impl FnMut(&ReadAttempt),
) -> Option<f64> {
    let outcome = extractor.read_rate(path).await;
    match &outcome {
        Ok(rate) => info!(benchmark, m, ?n, rate, "Read {}", path.display()),
        Err(err @ RateError::Malformed(_)) => warn!(benchmark, m, ?n, "{}: {err}", path.display()),
        Err(err) if err.is_missing_file() => {
            debug!(benchmark, m, ?n, "Missing {}", path.display())
        }
        Err(err) => info!(benchmark, m, ?n, "{}: {err}", path.display()),
    }
    progress(&ReadAttempt {
        benchmark,
        m,
        n,
        path,
        outcome: &outcome,
    });
    outcome.ok()
}

/// Reads `{benchmark}_m{m}.out` for every benchmark and m. Every m gets an entry, `None` when
/// the file is missing or has no usable rate.
pub async fn aggregate_bimodal(
    extractor: &RateExtractor,
    data_dir: &Path,
    benchmarks: &[String],
    m: &SweepRange,
) -> BimodalSweep {
    aggregate_bimodal_with(extractor, data_dir, benchmarks, m, |_| {}).await
}

/// [`aggregate_bimodal`], reporting every read to `progress`
pub async fn aggregate_bimodal_with(
    extractor: &RateExtractor,
    data_dir: &Path,
    benchmarks: &[String],
    m: &SweepRange,
    mut progress: impl FnMut(&ReadAttempt),
) -> BimodalSweep {
    let m_values = m.values();
    let mut series = Vec::with_capacity(benchmarks.len());
    for benchmark in benchmarks {
        let mut rates = Vec::with_capacity(m_values.len());
        for &m in &m_values {
            let path = data_dir.join(bimodal_filename(benchmark, m));
            rates.push(read_logged(extractor, &path, benchmark, m, None, &mut progress).await);
        }
        series.push(BimodalSeries {
            benchmark: benchmark.clone(),
            rates,
        });
    }
    BimodalSweep {
        m_values,
        benchmarks: series,
    }
}

/// Reads `{benchmark}_m{m}_n{n}.out` for every valid pair. Invalid pairs are never looked up and
/// failed reads leave no entry behind.
pub async fn aggregate_gshare(
    extractor: &RateExtractor,
    data_dir: &Path,
    space: &SweepSpace,
) -> GshareSweep {
    aggregate_gshare_with(extractor, data_dir, space, |_| {}).await
}

/// [`aggregate_gshare`], reporting every read to `progress`
pub async fn aggregate_gshare_with(
    extractor: &RateExtractor,
    data_dir: &Path,
    space: &SweepSpace,
    mut progress: impl FnMut(&ReadAttempt),
) -> GshareSweep {
    let m_values = space.m.values();
    let n_values = space.n.values();
    let mut series = Vec::with_capacity(space.benchmarks.len());
    for benchmark in &space.benchmarks {
        let mut by_history: BTreeMap<u32, Vec<(u32, f64)>> =
            n_values.iter().map(|&n| (n, Vec::new())).collect();
        for &m in &m_values {
            for &n in &n_values {
                if !(space.is_valid)(m, n) {
                    continue;
                }
                let path = data_dir.join(gshare_filename(benchmark, m, n));
                let rate =
                    read_logged(extractor, &path, benchmark, m, Some(n), &mut progress).await;
                if let Some(rate) = rate {
                    by_history.entry(n).or_default().push((m, rate));
                }
            }
        }
        series.push(GshareSeries {
            benchmark: benchmark.clone(),
            by_history,
        });
    }
    GshareSweep {
        m_values,
        n_values,
        benchmarks: series,
    }
}

/// Files a pipeline would read, in read order
pub fn planned_files(predictor: Predictor, data_dir: &Path, space: &SweepSpace) -> Vec<PathBuf> {
    let m_values = space.m.values();
    let n_values = space.n.values();
    let mut files = Vec::new();
    for benchmark in &space.benchmarks {
        for &m in &m_values {
            match predictor {
                Predictor::Bimodal => files.push(data_dir.join(bimodal_filename(benchmark, m))),
                Predictor::Gshare => files.extend(
                    n_values
                        .iter()
                        .filter(|&&n| (space.is_valid)(m, n))
                        .map(|&n| data_dir.join(gshare_filename(benchmark, m, n))),
                ),
            }
        }
    }
    files
}
