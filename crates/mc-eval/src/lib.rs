//! # mc-eval
//!
//! Classifier performance evaluation for mvacut.
//!
//! - [`metrics`]: efficiency, purity, figure of merit and their errors
//! - [`optimal_cut`]: threshold scan, interpolation and FoM maximization
//! - [`energy_bins`]: per-bin performance along a covariate
//! - [`confusion`], [`score_hist`], [`graph`]: plot inputs
//! - [`reader`]: applying trained models to event tables
//!
//! ## Example
//!
//! ```no_run
//! use mc_eval::{CutScanConfig, find_optimal_cut};
//!
//! let signal = vec![0.4, 0.7, 0.9];
//! let background = vec![-0.6, -0.2, 0.5];
//! let solution = find_optimal_cut("BDT", &signal, &background, &CutScanConfig::default()).unwrap();
//! println!("cut = {:.4}, FoM = {:.4}", solution.optimum.cut, solution.optimum.fom);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod confusion;
pub mod energy_bins;
pub mod graph;
pub mod maximize;
pub mod metrics;
pub mod optimal_cut;
pub mod reader;
pub mod rundir;
pub mod score_hist;
pub mod scores;
pub mod spline;
pub mod training;

pub use confusion::{ConfusionCounts, ConfusionMatrix, ConfusionMode};
pub use energy_bins::{
    BinEdges, DEFAULT_COVARIATE, ENERGY_TABLE, EnergyBinRow, EnergyBinnedMetrics, METRIC_SUFFIXES,
    MethodCut, energy_binned_metrics, write_energy_bins,
};
pub use graph::{
    GraphSeries, GraphType, PerformanceGraph, performance_graph, performance_graph_from_store,
};
pub use maximize::{MaximizerConfig, Maximum, maximize_sampled};
pub use metrics::MetricsRecord;
pub use optimal_cut::{
    CurveInterpolants, CutCurve, CutScanConfig, CutSolution, DEFAULT_RESULTS_TABLE, OptimalCut,
    find_optimal_cut, log_optimal_cut, optimal_cut_from_store, scan_cut_curve,
};
pub use reader::{ModelFile, ModelReader, ScoringModel, format_registry};
pub use rundir::create_timestamped_dir;
pub use score_hist::{AxisScale, ScoreDistribution, ScoreHistConfig, ScoreRange, score_distribution};
pub use scores::ClassScores;
pub use spline::{Interpolant, Interpolation};
pub use training::{MethodConfig, weights_path};
