//! Splitter integration: partition completeness and store layout on disk.

use std::path::PathBuf;

use mc_table::{
    BACKGROUND_TABLE, Column, EventTable, Expression, InteractionType, SIGNAL_TABLE, SplitSpec,
    TableStore, WriteMode, define_cvn_max, split_events, write_split,
};
use proptest::prelude::*;

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("mc_table_it_{tag}_{}_{nanos}", std::process::id()))
}

fn atmo_events() -> EventTable {
    EventTable::from_columns(
        "atmoOutput",
        [
            ("EventId".to_string(), Column::Float((0..8).map(f64::from).collect())),
            (
                "TrueNuPdg".to_string(),
                Column::Float(vec![14.0, -14.0, 12.0, 14.0, -12.0, 16.0, 14.0, 12.0]),
            ),
            ("IsCC".to_string(), Column::Float(vec![1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0])),
            (
                "CVNScoreNuE".to_string(),
                Column::Float(vec![0.1, 0.2, 0.8, -999.0, 0.6, 0.3, 0.05, 0.2]),
            ),
            (
                "CVNScoreNuMu".to_string(),
                Column::Float(vec![0.8, 0.7, 0.1, -999.0, 0.2, 0.3, 0.9, 0.1]),
            ),
            (
                "CVNScoreNC".to_string(),
                Column::Float(vec![0.1, 0.1, 0.1, -999.0, 0.2, 0.4, 0.05, 0.7]),
            ),
            ("TrueNuE".to_string(), Column::Float(vec![0.5, 1.5, 3.0, 5.0, 7.0, 9.0, 2.0, 4.0])),
        ],
    )
    .unwrap()
}

#[test]
fn numu_preset_split_is_a_partition() {
    let events = atmo_events();
    let spec = SplitSpec::preset(InteractionType::NuMu)
        .unwrap()
        .with_keep(vec!["EventId".into(), "CVNScoreNuMu".into(), "TrueNuE".into()]);
    let out = split_events(&events, &spec).unwrap();

    assert_eq!(out.summary.input_rows, 8);
    assert_eq!(out.summary.excluded_rows, 1);
    assert!((out.summary.excluded_fraction - 0.125).abs() < 1e-12);
    assert_eq!(out.signal.f64_column("EventId").unwrap(), &[0.0, 1.0, 6.0]);
    assert_eq!(out.background.f64_column("EventId").unwrap(), &[2.0, 4.0, 5.0, 7.0]);
    assert_eq!(out.signal.column_names(), ["EventId", "CVNScoreNuMu", "TrueNuE"]);
    assert!(!out.signal.has_column("TrueNuPdg"));
}

#[test]
fn write_split_recreates_signal_and_adds_background() {
    let dir = tmp_dir("write");
    let stale = TableStore::create(&dir, WriteMode::Recreate).unwrap();
    stale.write_table(&atmo_events().renamed("Leftover")).unwrap();

    let spec = SplitSpec::new(Expression::parse("!IsCC").unwrap());
    let out = split_events(&atmo_events(), &spec).unwrap();
    let store = write_split(&out, &dir).unwrap();

    assert_eq!(store.table_names().unwrap(), [BACKGROUND_TABLE, SIGNAL_TABLE]);
    let sig = store.read_table(SIGNAL_TABLE).unwrap();
    let bkg = store.read_table(BACKGROUND_TABLE).unwrap();
    assert_eq!(sig.n_rows(), 2);
    assert_eq!(bkg.n_rows(), 6);
    assert_eq!(sig, out.signal);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cvn_max_column_survives_projection() {
    let mut events = atmo_events();
    let col = define_cvn_max(&mut events, InteractionType::NuMu).unwrap();
    let spec = SplitSpec::preset(InteractionType::NuMu)
        .unwrap()
        .with_keep(vec!["EventId".into(), col.clone()]);
    let out = split_events(&events, &spec).unwrap();
    assert_eq!(out.signal.f64_column(&col).unwrap(), &[1.0, 1.0, 1.0]);
}

#[test]
fn missing_keep_column_is_an_error() {
    let spec = SplitSpec::new(Expression::parse("IsCC").unwrap()).with_keep(vec!["Nope".into()]);
    assert!(split_events(&atmo_events(), &spec).is_err());
}

proptest! {
    #[test]
    fn every_surviving_row_lands_in_exactly_one_partition(
        rows in prop::collection::vec((-5.0f64..5.0, 0u8..2, -1.0f64..1.0), 0..200),
        cut in -5.0f64..5.0,
    ) {
        let ids: Vec<f64> = (0..rows.len()).map(|i| i as f64).collect();
        let x: Vec<f64> = rows.iter().map(|r| r.0).collect();
        let flag: Vec<f64> = rows.iter().map(|r| f64::from(r.1)).collect();
        let s: Vec<f64> = rows.iter().map(|r| r.2).collect();
        let events = EventTable::from_columns("e", [
            ("id".to_string(), Column::Float(ids)),
            ("x".to_string(), Column::Float(x.clone())),
            ("flag".to_string(), Column::Float(flag)),
            ("s".to_string(), Column::Float(s)),
        ]).unwrap();

        let spec = SplitSpec::new(Expression::parse(&format!("x > {cut} && flag")).unwrap())
            .with_exclusion(Expression::parse("s > -0.5").unwrap());
        let out = split_events(&events, &spec).unwrap();

        let mut seen: Vec<f64> = out.signal.f64_column("id").unwrap().to_vec();
        seen.extend_from_slice(out.background.f64_column("id").unwrap());
        seen.sort_by(f64::total_cmp);
        let expected: Vec<f64> = rows.iter().enumerate()
            .filter(|(_, r)| r.2 > -0.5)
            .map(|(i, _)| i as f64)
            .collect();
        prop_assert_eq!(seen, expected);
        prop_assert_eq!(
            out.summary.signal_rows + out.summary.background_rows + out.summary.excluded_rows,
            rows.len()
        );
    }
}
