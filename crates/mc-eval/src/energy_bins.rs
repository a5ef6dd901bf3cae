//! Per-bin performance of several methods along a covariate (true energy).

use mc_core::{Error, Result};
use mc_table::{Column, EventTable, TableStore, WriteMode};
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsRecord;

/// Table name of the energy-binned results.
pub const ENERGY_TABLE: &str = "data";

/// Default binning covariate.
pub const DEFAULT_COVARIATE: &str = "TrueNuE";

/// Strictly increasing bin edges (at least two).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    /// Validate edges.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::Config(format!(
                "energy bin list must contain at least two edges, got {}",
                edges.len()
            )));
        }
        if let Some(e) = edges.iter().find(|e| !e.is_finite()) {
            return Err(Error::Config(format!("energy bin edge {e} is not finite")));
        }
        if let Some(w) = edges.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::Config(format!(
                "energy bin edges must be strictly increasing, got {} then {}",
                w[0], w[1]
            )));
        }
        Ok(Self(edges))
    }

    /// Number of bins (`edges - 1`).
    pub fn n_bins(&self) -> usize {
        self.0.len() - 1
    }

    /// Edges.
    pub fn edges(&self) -> &[f64] {
        &self.0
    }

    /// Half-open bins `[lo, hi)`.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }
}

impl TryFrom<Vec<f64>> for BinEdges {
    type Error = Error;

    fn try_from(v: Vec<f64>) -> Result<Self> {
        Self::new(v)
    }
}

impl From<BinEdges> for Vec<f64> {
    fn from(b: BinEdges) -> Self {
        b.0
    }
}

/// A method's score column and its selection threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCut {
    /// Score column name.
    pub method: String,
    /// Events with `score > cut` pass.
    pub cut: f64,
}

/// One covariate bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyBinRow {
    /// Lower edge (inclusive).
    pub bin_min: f64,
    /// Upper edge (exclusive).
    pub bin_max: f64,
    /// Midpoint.
    pub bin_mid: f64,
    /// Signal plus background rows in the bin.
    pub bin_count: f64,
    /// Signal rows in the bin.
    pub signal_count: f64,
    /// Background rows in the bin.
    pub background_count: f64,
    /// Metrics per method, in method order.
    pub metrics: Vec<MetricsRecord>,
}

/// Energy-binned metrics for a list of methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyBinnedMetrics {
    /// Binning covariate.
    pub covariate: String,
    /// Method names, in column order.
    pub methods: Vec<String>,
    /// One row per bin.
    pub rows: Vec<EnergyBinRow>,
}

/// Column suffixes written per method, in order.
pub const METRIC_SUFFIXES: [&str; 6] = ["_eff", "_eff_err", "_pur", "_pur_err", "_fom", "_fom_err"];

impl EnergyBinnedMetrics {
    /// Flatten into the `data` table layout:
    /// `binMin, binMax, binMid, binCount`, then per method the
    /// [`METRIC_SUFFIXES`] columns.
    pub fn to_table(&self) -> Result<EventTable> {
        let col = |f: &dyn Fn(&EnergyBinRow) -> f64| -> Column {
            Column::Float(self.rows.iter().map(f).collect())
        };
        let mut columns = vec![
            ("binMin".to_string(), col(&|r| r.bin_min)),
            ("binMax".to_string(), col(&|r| r.bin_max)),
            ("binMid".to_string(), col(&|r| r.bin_mid)),
            ("binCount".to_string(), col(&|r| r.bin_count)),
        ];
        for (j, m) in self.methods.iter().enumerate() {
            let fields: [fn(&MetricsRecord) -> f64; 6] = [
                |r| r.efficiency,
                |r| r.eff_err,
                |r| r.purity,
                |r| r.pur_err,
                |r| r.fom,
                |r| r.fom_err,
            ];
            for (suffix, get) in METRIC_SUFFIXES.iter().zip(fields) {
                columns.push((format!("{m}{suffix}"), col(&|r| get(&r.metrics[j]))));
            }
        }
        Ok(EventTable::from_columns(ENERGY_TABLE, columns)?)
    }
}

fn count_passing(scores: &[f64], cut: f64) -> f64 {
    scores.iter().filter(|&&s| s > cut).count() as f64
}

/// Metrics per covariate bin for each method.
///
/// Each bin keeps rows with `lo <= covariate < hi`. A method's pass count is
/// the number of rows in the bin with `score > cut`.
pub fn energy_binned_metrics(
    signal: &EventTable,
    background: &EventTable,
    covariate: &str,
    methods: &[MethodCut],
    edges: &BinEdges,
) -> Result<EnergyBinnedMetrics> {
    for (i, m) in methods.iter().enumerate() {
        if methods[..i].iter().any(|o| o.method == m.method) {
            return Err(Error::Config(format!("method '{}' listed twice", m.method)));
        }
    }
    tracing::info!(n_bins = edges.n_bins(), covariate, "computing energy-binned performance");

    let mut rows = Vec::with_capacity(edges.n_bins());
    for (lo, hi) in edges.bins() {
        let sig_bin = signal.filter_range(covariate, lo, hi)?;
        let bkg_bin = background.filter_range(covariate, lo, hi)?;
        let n_sig_total = sig_bin.n_rows() as f64;
        let n_bkg_total = bkg_bin.n_rows() as f64;
        tracing::info!(lo, hi, signal = n_sig_total, background = n_bkg_total, "bin");

        let mut metrics = Vec::with_capacity(methods.len());
        for m in methods {
            let n_sig = count_passing(sig_bin.f64_column(&m.method)?, m.cut);
            let n_bkg = count_passing(bkg_bin.f64_column(&m.method)?, m.cut);
            let rec = MetricsRecord::compute(n_sig, n_bkg, n_sig_total);
            tracing::debug!(
                method = m.method.as_str(),
                efficiency = rec.efficiency,
                purity = rec.purity,
                fom = rec.fom,
                "bin metrics"
            );
            metrics.push(rec);
        }

        rows.push(EnergyBinRow {
            bin_min: lo,
            bin_max: hi,
            bin_mid: 0.5 * (lo + hi),
            bin_count: n_sig_total + n_bkg_total,
            signal_count: n_sig_total,
            background_count: n_bkg_total,
            metrics,
        });
    }

    Ok(EnergyBinnedMetrics {
        covariate: covariate.to_string(),
        methods: methods.iter().map(|m| m.method.clone()).collect(),
        rows,
    })
}

/// Write the `data` table to a fresh store at `out`.
pub fn write_energy_bins(result: &EnergyBinnedMetrics, out: &std::path::Path) -> Result<TableStore> {
    let store = TableStore::create(out, WriteMode::Recreate)?;
    store.write_table(&result.to_table()?)?;
    tracing::info!(output = %out.display(), rows = result.rows.len(), "wrote energy-binned data");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_validation() {
        assert!(matches!(BinEdges::new(vec![]), Err(Error::Config(_))));
        assert!(matches!(BinEdges::new(vec![1.0]), Err(Error::Config(_))));
        assert!(BinEdges::new(vec![0.0, 2.0, 1.0]).is_err());
        assert!(BinEdges::new(vec![0.0, 1.0, 1.0]).is_err());
        assert!(BinEdges::new(vec![0.0, f64::INFINITY]).is_err());
        assert_eq!(BinEdges::new(vec![0.0, 1.0, 2.0]).unwrap().n_bins(), 2);
        assert!(serde_json::from_str::<BinEdges>("[3.0]").is_err());
    }

    #[test]
    fn duplicate_methods_rejected() {
        let t = EventTable::from_columns("s", [("TrueNuE".to_string(), Column::Float(vec![1.0]))])
            .unwrap();
        let m = MethodCut { method: "BDT".into(), cut: 0.0 };
        let edges = BinEdges::new(vec![0.0, 2.0]).unwrap();
        let err = energy_binned_metrics(&t, &t, "TrueNuE", &[m.clone(), m], &edges).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn missing_columns_are_data_errors() {
        let t = EventTable::from_columns(
            "Signal",
            [
                ("TrueNuE".to_string(), Column::Float(vec![0.5, 1.5])),
                ("BDT".to_string(), Column::Float(vec![0.1, 0.9])),
            ],
        )
        .unwrap();
        let edges = BinEdges::new(vec![0.0, 1.0, 2.0]).unwrap();
        let missing_score = MethodCut { method: "MLP".into(), cut: 0.0 };
        let err = energy_binned_metrics(&t, &t, "TrueNuE", &[missing_score], &edges).unwrap_err();
        assert!(matches!(err, Error::Data(_)), "{err}");

        let bdt = MethodCut { method: "BDT".into(), cut: 0.0 };
        let err = energy_binned_metrics(&t, &t, "RecoE", &[bdt.clone()], &edges).unwrap_err();
        assert!(matches!(err, Error::Data(_)), "{err}");

        let ok = energy_binned_metrics(&t, &t, "TrueNuE", &[bdt], &edges).unwrap();
        assert_eq!(ok.rows.len(), 2);
    }
}
