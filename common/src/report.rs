//! Console tables for aggregated sweeps. Nothing here filters or reorders data.

use std::fmt::Write;

use itertools::Itertools;

use crate::sweep::{BimodalSweep, GshareSweep, ReadAttempt};

const UNAVAILABLE: &str = "unavailable";

fn format_rate(rate: f64) -> String {
    format!("{rate:?}")
}

fn format_optional(rate: Option<f64>) -> String {
    rate.map(format_rate).unwrap_or_else(|| "n/a".to_owned())
}

/// Progress line for one gshare lookup, ie. `gcc m = 9, n = 4: 11.25%`
pub fn attempt_line(attempt: &ReadAttempt) -> String {
    let pair = match attempt.n {
        Some(n) => format!("m = {}, n = {n}", attempt.m),
        None => format!("m = {}", attempt.m),
    };
    match attempt.rate() {
        Some(rate) => format!("{} {pair}: {}%", attempt.benchmark, format_rate(rate)),
        None => format!("{} {pair}: {UNAVAILABLE}", attempt.benchmark),
    }
}

/// One line per (benchmark, m) under a per-benchmark heading
pub fn bimodal_listing(sweep: &BimodalSweep) -> String {
    let mut out = String::new();
    for series in &sweep.benchmarks {
        _ = writeln!(out, "{} Misprediction Rates:", series.benchmark.to_uppercase());
        for (m, rate) in sweep.m_values.iter().zip(&series.rates) {
            match rate {
                Some(rate) => {
                    _ = writeln!(out, "m = {m}: {}%", format_rate(*rate));
                }
                None => {
                    _ = writeln!(out, "m = {m}: {UNAVAILABLE}");
                }
            }
        }
    }
    out
}

/// One line per (benchmark, n) with that history length's rates in m order
pub fn gshare_listing(sweep: &GshareSweep) -> String {
    let mut out = String::new();
    for series in &sweep.benchmarks {
        _ = writeln!(out, "{} Misprediction Rates:", series.benchmark.to_uppercase());
        for (n, points) in &series.by_history {
            _ = writeln!(
                out,
                "n = {n}: [{}]",
                points.iter().map(|(_, rate)| format_rate(*rate)).join(", ")
            );
        }
    }
    out
}

/// Compact `{benchmark}_rates = [..]` lines for pasting into a write-up
pub fn bimodal_summary(sweep: &BimodalSweep) -> String {
    let mut out = String::new();
    for series in &sweep.benchmarks {
        _ = writeln!(
            out,
            "{}_rates = [{}]",
            series.benchmark,
            series.rates.iter().map(|r| format_optional(*r)).join(", ")
        );
    }
    out
}

pub fn gshare_summary(sweep: &GshareSweep) -> String {
    let mut out = String::new();
    for series in &sweep.benchmarks {
        for (n, points) in &series.by_history {
            _ = writeln!(
                out,
                "{}_n{n}_rates = [{}]",
                series.benchmark,
                points
                    .iter()
                    .map(|(m, rate)| format!("({m}, {})", format_rate(*rate)))
                    .join(", ")
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::sweep::{BimodalSeries, GshareSeries};

    #[test]
    fn bimodal_listing_marks_unavailable() {
        let sweep = BimodalSweep {
            m_values: vec![7, 8, 9],
            benchmarks: vec![BimodalSeries {
                benchmark: "jpeg".to_owned(),
                rates: vec![Some(7.92), None, Some(0.0)],
            }],
        };
        assert_eq!(
            bimodal_listing(&sweep),
            "JPEG Misprediction Rates:\nm = 7: 7.92%\nm = 8: unavailable\nm = 9: 0.0%\n"
        );
        assert_eq!(bimodal_summary(&sweep), "jpeg_rates = [7.92, n/a, 0.0]\n");
    }

    #[test]
    fn gshare_listing_prints_empty_histories() {
        let mut by_history = BTreeMap::new();
        by_history.insert(2, vec![(7, 12.0), (8, 11.25)]);
        by_history.insert(10, vec![]);
        let sweep = GshareSweep {
            m_values: vec![7, 8],
            n_values: vec![2, 10],
            benchmarks: vec![GshareSeries {
                benchmark: "gcc".to_owned(),
                by_history,
            }],
        };
        assert_eq!(
            gshare_listing(&sweep),
            "GCC Misprediction Rates:\nn = 2: [12.0, 11.25]\nn = 10: []\n"
        );
        assert_eq!(
            gshare_summary(&sweep),
            "gcc_n2_rates = [(7, 12.0), (8, 11.25)]\ngcc_n10_rates = []\n"
        );
    }

    #[test]
    fn empty_sweeps_print_nothing() {
        let sweep = BimodalSweep {
            m_values: vec![],
            benchmarks: vec![],
        };
        assert_eq!(bimodal_listing(&sweep), "");
        assert_eq!(bimodal_summary(&sweep), "");
    }

    #[test]
    fn attempt_lines_show_value_or_absence() {
        let path = std::path::Path::new("gcc_m9_n4.out");
        let read = Ok(11.25);
        let attempt = ReadAttempt {
            benchmark: "gcc",
            m: 9,
            n: Some(4),
            path,
            outcome: &read,
        };
        assert_eq!(attempt_line(&attempt), "gcc m = 9, n = 4: 11.25%");

        let missing = Err(crate::result::RateError::NotFound);
        let attempt = ReadAttempt {
            outcome: &missing,
            ..attempt
        };
        assert_eq!(attempt_line(&attempt), "gcc m = 9, n = 4: unavailable");
    }
}
