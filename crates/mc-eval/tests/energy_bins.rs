//! Energy-binned aggregation, the `data` table layout, and graphs read back from it.

use std::path::PathBuf;

use approx::assert_relative_eq;
use mc_eval::{
    BinEdges, DEFAULT_COVARIATE, ENERGY_TABLE, GraphType, MethodCut, energy_binned_metrics,
    performance_graph_from_store, write_energy_bins,
};
use mc_table::{Column, EventTable};

fn table(name: &str, energy: &[f64], bdt: &[f64]) -> EventTable {
    EventTable::from_columns(
        name,
        [
            (DEFAULT_COVARIATE.to_string(), Column::Float(energy.to_vec())),
            ("BDT".to_string(), Column::Float(bdt.to_vec())),
        ],
    )
    .unwrap()
}

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("mc_eval_energy_{tag}_{}_{nanos}", std::process::id()))
}

#[test]
fn six_bins_with_midpoints() {
    let signal = table("Signal", &[0.5, 1.2, 3.0, 3.5, 9.9, 10.0], &[0.9, 0.2, 0.8, 0.7, 0.6, 0.9]);
    let background = table("Background", &[0.1, 3.1, 5.0], &[0.95, -0.5, 0.1]);
    let edges = BinEdges::new(vec![0.0, 1.0, 2.0, 4.0, 6.0, 8.0, 10.0]).unwrap();
    let methods = [MethodCut { method: "BDT".into(), cut: 0.5 }];

    let res =
        energy_binned_metrics(&signal, &background, DEFAULT_COVARIATE, &methods, &edges).unwrap();
    assert_eq!(res.rows.len(), 6);
    let mids: Vec<f64> = res.rows.iter().map(|r| r.bin_mid).collect();
    assert_eq!(mids, vec![0.5, 1.5, 3.0, 5.0, 7.0, 9.0]);

    // [0,1): one signal passing, one background passing.
    let first = &res.rows[0];
    assert_eq!(first.bin_count, 2.0);
    assert_relative_eq!(first.metrics[0].efficiency, 1.0);
    assert_relative_eq!(first.metrics[0].purity, 0.5);
    // [2,4): both signal pass, background fails.
    assert_relative_eq!(res.rows[2].metrics[0].fom, 1.0);
    // [6,8) is empty; 10.0 sits on the upper edge and is dropped.
    assert_eq!(res.rows[4].bin_count, 0.0);
    assert_eq!(res.rows[4].metrics[0].efficiency, 0.0);
    assert_eq!(res.rows[5].signal_count, 1.0);
}

#[test]
fn data_table_layout_and_graphs() {
    let signal = table("Signal", &[0.5, 1.5], &[0.9, 0.1]);
    let background = table("Background", &[0.5, 1.5], &[0.2, 0.8]);
    let edges = BinEdges::new(vec![0.0, 1.0, 2.0]).unwrap();
    let methods =
        [MethodCut { method: "BDT".into(), cut: 0.5 }, MethodCut { method: "BDT2".into(), cut: 0.0 }];
    let mut bkg2 = background.clone();
    bkg2.define("BDT2", &"BDT - 0.3".parse().unwrap()).unwrap();
    let mut sig2 = signal.clone();
    sig2.define("BDT2", &"BDT".parse().unwrap()).unwrap();

    let res = energy_binned_metrics(&sig2, &bkg2, DEFAULT_COVARIATE, &methods, &edges).unwrap();
    let out = tmp_dir("layout");
    let store = write_energy_bins(&res, &out).unwrap();
    let data = store.read_table(ENERGY_TABLE).unwrap();
    let names: Vec<&str> = data.column_names().iter().map(String::as_str).collect();
    assert_eq!(
        names,
        [
            "binMin", "binMax", "binMid", "binCount", "BDT_eff", "BDT_eff_err", "BDT_pur",
            "BDT_pur_err", "BDT_fom", "BDT_fom_err", "BDT2_eff", "BDT2_eff_err", "BDT2_pur",
            "BDT2_pur_err", "BDT2_fom", "BDT2_fom_err",
        ]
    );

    let graph =
        performance_graph_from_store(&store, &res.methods, GraphType::Efficiency).unwrap();
    assert_eq!(graph.x, vec![0.5, 1.5]);
    assert_eq!(graph.series.len(), 2);
    assert_eq!(graph.series[0].y, vec![1.0, 0.0]);
    std::fs::remove_dir_all(&out).ok();
}
