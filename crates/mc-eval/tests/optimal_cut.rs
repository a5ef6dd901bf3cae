//! Optimal-cut solver on synthetic Gaussian score populations.

use std::path::PathBuf;

use approx::assert_relative_eq;
use mc_eval::{
    CutScanConfig, DEFAULT_RESULTS_TABLE, Interpolation, find_optimal_cut, log_optimal_cut,
    optimal_cut_from_store,
};
use mc_table::{
    BACKGROUND_TABLE, Column, EventTable, SIGNAL_TABLE, TableStore, UpsertOutcome, WriteMode,
    lookup_by_key,
};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn sample(mean: f64, sd: f64, n: usize, seed: u64) -> Vec<f64> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let dist = Normal::new(mean, sd).unwrap();
    (0..n).map(|_| dist.sample(&mut rng)).collect()
}

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("mc_eval_cut_{tag}_{}_{nanos}", std::process::id()))
}

fn scores_table(name: &str, method: &str, scores: Vec<f64>) -> EventTable {
    EventTable::from_columns(name, [(method.to_string(), Column::Float(scores))]).unwrap()
}

#[test]
fn cut_lies_between_class_means() {
    let sig = sample(0.5, 0.2, 5000, 1);
    let bkg = sample(-0.5, 0.2, 5000, 2);
    let sol = find_optimal_cut("BDT", &sig, &bkg, &CutScanConfig::default()).unwrap();

    assert!(sol.optimum.cut > -0.5 && sol.optimum.cut < 0.5, "cut = {}", sol.optimum.cut);
    let fom = sol.curve.fom();
    assert!(sol.optimum.fom > fom[0]);
    assert!(sol.optimum.fom > fom[fom.len() - 1]);
    assert!(sol.optimum.fom >= fom.iter().cloned().fold(f64::MIN, f64::max) - 1e-9);
    assert!(sol.optimum.efficiency > 0.9 && sol.optimum.purity > 0.9);
}

#[test]
fn efficiency_never_increases_with_threshold() {
    let sig = sample(0.2, 0.4, 2000, 3);
    let bkg = sample(-0.3, 0.4, 2000, 4);
    let cfg = CutScanConfig { n_bins: 200, ..Default::default() };
    let sol = find_optimal_cut("MLP", &sig, &bkg, &cfg).unwrap();
    let eff = sol.curve.efficiency();
    assert_relative_eq!(eff[0], 1.0);
    assert!(eff.windows(2).all(|w| w[1] <= w[0]));
    assert!(sol.curve.purity().iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn interpolation_choice_keeps_cut_between_means() {
    let sig = sample(0.4, 0.25, 3000, 5);
    let bkg = sample(-0.4, 0.25, 3000, 6);
    for interpolation in [Interpolation::Natural, Interpolation::Monotone, Interpolation::Linear] {
        let cfg = CutScanConfig { interpolation, ..Default::default() };
        let sol = find_optimal_cut("BDT", &sig, &bkg, &cfg).unwrap();
        assert!(sol.optimum.cut > -0.4 && sol.optimum.cut < 0.4, "{interpolation}");
    }
}

#[test]
fn store_round_trip_and_results_log() {
    let events = tmp_dir("events");
    let results = tmp_dir("results");
    let store = TableStore::create(&events, WriteMode::Recreate).unwrap();
    store.write_table(&scores_table(SIGNAL_TABLE, "BDT", sample(0.5, 0.2, 1000, 7))).unwrap();
    store.write_table(&scores_table(BACKGROUND_TABLE, "BDT", sample(-0.5, 0.2, 1000, 8))).unwrap();

    let sol = optimal_cut_from_store(&store, "BDT", &CutScanConfig::default()).unwrap();
    let log = TableStore::create(&results, WriteMode::Recreate).unwrap();
    assert_eq!(
        log_optimal_cut(&log, DEFAULT_RESULTS_TABLE, &sol.optimum).unwrap(),
        UpsertOutcome::Created
    );
    assert_eq!(
        log_optimal_cut(&log, DEFAULT_RESULTS_TABLE, &sol.optimum).unwrap(),
        UpsertOutcome::Updated
    );

    let table = log.read_table(DEFAULT_RESULTS_TABLE).unwrap();
    assert_eq!(table.n_rows(), 1);
    let row = lookup_by_key(&table, "Method", "BDT").unwrap().unwrap();
    let cut = row.iter().find(|(k, _)| k == "MaxCut").unwrap().1;
    assert_relative_eq!(cut, sol.optimum.cut);

    std::fs::remove_dir_all(&events).ok();
    std::fs::remove_dir_all(&results).ok();
}

#[test]
fn missing_score_column_is_data_error() {
    let events = tmp_dir("missing");
    let store = TableStore::create(&events, WriteMode::Recreate).unwrap();
    store.write_table(&scores_table(SIGNAL_TABLE, "BDT", vec![0.1])).unwrap();
    store.write_table(&scores_table(BACKGROUND_TABLE, "BDT", vec![-0.1])).unwrap();
    let err = optimal_cut_from_store(&store, "MLP", &CutScanConfig::default()).unwrap_err();
    assert!(matches!(err, mc_core::Error::Data(_)));
    std::fs::remove_dir_all(&events).ok();
}
