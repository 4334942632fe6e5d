use std::{fs, path::Path};

use common::{
    config::SweepRange,
    report::bimodal_listing,
    result::RateExtractor,
    sweep::{
        SweepSpace, aggregate_bimodal, aggregate_gshare, bimodal_filename, gshare_filename,
        history_fits,
    },
};
use tempfile::TempDir;

fn write_result(dir: &Path, name: &str, rate: &str) {
    let output = format!(
        "COMMAND\n./sim gshare\nOUTPUT\nnumber of predictions: 2000000\n\
         misprediction rate: {rate}%\nFINAL GSHARE CONTENTS\n0\t2\n"
    );
    fs::write(dir.join(name), output).unwrap();
}

fn benchmarks(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn gshare_space(names: &[&str], m: SweepRange, n: SweepRange) -> SweepSpace {
    SweepSpace {
        benchmarks: benchmarks(names),
        m,
        n,
        is_valid: history_fits,
    }
}

fn populated_bimodal_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (m, rate) in (7..=12).zip(["10.5", "9.5", "8.5", "7.5", "6.25", "5.0"]) {
        write_result(dir.path(), &bimodal_filename("gcc", m), rate);
    }
    dir
}

#[tokio::test]
async fn bimodal_sweep_end_to_end() {
    let dir = populated_bimodal_dir();
    let extractor = RateExtractor::new().unwrap();
    let sweep = aggregate_bimodal(
        &extractor,
        dir.path(),
        &benchmarks(&["gcc"]),
        &SweepRange::new(7, 12, 1),
    )
    .await;

    assert_eq!(sweep.m_values, vec![7, 8, 9, 10, 11, 12]);
    let gcc = sweep.series("gcc").unwrap();
    assert_eq!(
        gcc.rates,
        vec![
            Some(10.5),
            Some(9.5),
            Some(8.5),
            Some(7.5),
            Some(6.25),
            Some(5.0)
        ]
    );

    let listing = bimodal_listing(&sweep);
    let lines = listing.lines().skip(1).collect::<Vec<_>>();
    assert_eq!(
        lines,
        vec![
            "m = 7: 10.5%",
            "m = 8: 9.5%",
            "m = 9: 8.5%",
            "m = 10: 7.5%",
            "m = 11: 6.25%",
            "m = 12: 5.0%"
        ]
    );
}

#[tokio::test]
async fn bimodal_keeps_placeholders_for_missing_and_broken_files() {
    let dir = tempfile::tempdir().unwrap();
    write_result(dir.path(), &bimodal_filename("jpeg", 7), "7.92");
    fs::write(dir.path().join(bimodal_filename("jpeg", 9)), "simulation crashed\n").unwrap();
    write_result(dir.path(), &bimodal_filename("jpeg", 10), "7.6.1");
    write_result(dir.path(), &bimodal_filename("jpeg", 12), "0");

    let extractor = RateExtractor::new().unwrap();
    let sweep = aggregate_bimodal(
        &extractor,
        dir.path(),
        &benchmarks(&["gcc", "jpeg"]),
        &SweepRange::new(7, 12, 1),
    )
    .await;

    assert_eq!(sweep.benchmarks.len(), 2);
    assert_eq!(sweep.benchmarks[0].benchmark, "gcc");
    assert_eq!(sweep.benchmarks[0].rates, vec![None; 6]);
    assert_eq!(
        sweep.series("jpeg").unwrap().rates,
        vec![Some(7.92), None, None, None, None, Some(0.0)]
    );
}

#[tokio::test]
async fn gshare_never_reports_history_longer_than_index() {
    let dir = tempfile::tempdir().unwrap();
    for m in 7..=12 {
        for n in (2..=12).step_by(2) {
            write_result(dir.path(), &gshare_filename("gcc", m, n), "4.5");
        }
    }

    let extractor = RateExtractor::new().unwrap();
    let space = gshare_space(&["gcc"], SweepRange::new(7, 12, 1), SweepRange::new(2, 12, 2));
    let sweep = aggregate_gshare(&extractor, dir.path(), &space).await;

    let gcc = sweep.series("gcc").unwrap();
    for (n, points) in &gcc.by_history {
        for (m, _) in points {
            assert!(n <= m, "n={n} m={m}");
        }
    }
    assert_eq!(
        gcc.history(2).iter().map(|(m, _)| *m).collect::<Vec<_>>(),
        vec![7, 8, 9, 10, 11, 12]
    );
    assert_eq!(
        gcc.history(10).iter().map(|(m, _)| *m).collect::<Vec<_>>(),
        vec![10, 11, 12]
    );
    assert_eq!(gcc.history(12), &[(12, 4.5)]);
}

#[tokio::test]
async fn gshare_omits_missing_pairs() {
    let dir = tempfile::tempdir().unwrap();
    write_result(dir.path(), &gshare_filename("gcc", 8, 2), "6.1");
    write_result(dir.path(), &gshare_filename("gcc", 8, 4), "5.9");
    fs::write(dir.path().join(gshare_filename("gcc", 9, 6)), "no rate here\n").unwrap();

    let extractor = RateExtractor::new().unwrap();
    let space = gshare_space(&["gcc"], SweepRange::new(8, 9, 1), SweepRange::new(2, 6, 2));
    let sweep = aggregate_gshare(&extractor, dir.path(), &space).await;

    let gcc = sweep.series("gcc").unwrap();
    assert_eq!(gcc.history(2), &[(8, 6.1)]);
    assert_eq!(gcc.history(4), &[(8, 5.9)]);
    assert!(gcc.history(6).is_empty());
    assert_eq!(gcc.by_history.keys().copied().collect::<Vec<_>>(), vec![2, 4, 6]);
}

#[tokio::test]
async fn gshare_does_not_read_invalid_pairs() {
    let dir = tempfile::tempdir().unwrap();
    // Present on disk but n > m, so it must never be picked up
    write_result(dir.path(), &gshare_filename("jpeg", 7, 8), "1.0");
    write_result(dir.path(), &gshare_filename("jpeg", 8, 8), "2.0");

    let extractor = RateExtractor::new().unwrap();
    let space = gshare_space(&["jpeg"], SweepRange::new(7, 8, 1), SweepRange::new(8, 8, 1));
    let sweep = aggregate_gshare(&extractor, dir.path(), &space).await;

    assert_eq!(sweep.series("jpeg").unwrap().history(8), &[(8, 2.0)]);
}

#[tokio::test]
async fn aggregation_is_repeatable() {
    let dir = populated_bimodal_dir();
    write_result(dir.path(), &gshare_filename("gcc", 7, 2), "3.25");
    write_result(dir.path(), &gshare_filename("gcc", 9, 4), "2.75");

    let extractor = RateExtractor::new().unwrap();
    let names = benchmarks(&["gcc", "jpeg"]);
    let m = SweepRange::new(7, 12, 1);
    let first = aggregate_bimodal(&extractor, dir.path(), &names, &m).await;
    let second = aggregate_bimodal(&extractor, dir.path(), &names, &m).await;
    assert_eq!(first, second);

    let space = gshare_space(&["gcc", "jpeg"], m, SweepRange::new(2, 12, 2));
    let first = aggregate_gshare(&extractor, dir.path(), &space).await;
    let second = aggregate_gshare(&extractor, dir.path(), &space).await;
    assert_eq!(first, second);
}
