//! Efficiency, purity and figure of merit from pass counts.

use serde::{Deserialize, Serialize};

/// Selection performance for one threshold.
///
/// Zero denominators give zero, never an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// `n_sig / total_signal`.
    pub efficiency: f64,
    /// `n_sig / (n_sig + n_bkg)`.
    pub purity: f64,
    /// `efficiency * purity`.
    pub fom: f64,
    /// Binomial error on efficiency.
    pub eff_err: f64,
    /// Binomial error on purity.
    pub pur_err: f64,
    /// Propagated error on the figure of merit.
    pub fom_err: f64,
}

impl MetricsRecord {
    /// Metrics for `n_sig` signal and `n_bkg` background events passing a
    /// selection, out of `total_signal` signal events.
    pub fn compute(n_sig: f64, n_bkg: f64, total_signal: f64) -> Self {
        let selected = n_sig + n_bkg;
        let efficiency = if total_signal > 0.0 { n_sig / total_signal } else { 0.0 };
        let purity = if selected > 0.0 { n_sig / selected } else { 0.0 };
        let eff_err = if total_signal > 0.0 {
            (efficiency * (1.0 - efficiency) / total_signal).sqrt()
        } else {
            0.0
        };
        let pur_err =
            if selected > 0.0 { (purity * (1.0 - purity) / selected).sqrt() } else { 0.0 };
        let fom_err = ((purity * eff_err).powi(2) + (efficiency * pur_err).powi(2)).sqrt();
        Self { efficiency, purity, fom: efficiency * purity, eff_err, pur_err, fom_err }
    }
}
