//! `mvacut run`: the full evaluation pipeline from one config file.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use mc_eval::{
    BinEdges, ConfusionCounts, ConfusionMode, CutScanConfig, DEFAULT_COVARIATE,
    DEFAULT_RESULTS_TABLE, GraphType, MethodConfig, MethodCut, OptimalCut, ScoreHistConfig,
};
use mc_table::{
    BACKGROUND_TABLE, EventTable, Expression, InteractionType, SIGNAL_TABLE, SplitSpec,
    SplitSummary, TableStore, WriteMode,
};
use mc_viz::{
    ConfusionMatrixArtifact, CutCurveArtifact, EnergyPerformanceArtifact, ScoreOverlayArtifact,
    artifact_file_name,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Event source: a store with `Signal`/`Background` tables, or raw events
    /// when a `split` stage is configured.
    pub input: PathBuf,
    /// Table read from a store input.
    #[serde(default = "default_tree")]
    pub tree: String,
    /// Output directory for this run.
    pub out_dir: PathBuf,
    /// Write into `out_dir/run_YYYYMMDD_HHMM/` instead of `out_dir`.
    #[serde(default)]
    pub timestamped: bool,
    #[serde(default)]
    pub split: Option<SplitStage>,
    pub methods: Vec<MethodEntry>,
    #[serde(default)]
    pub cut_scan: CutScanConfig,
    #[serde(default)]
    pub results: Option<ResultsConfig>,
    #[serde(default = "default_confusion_modes")]
    pub confusion_modes: Vec<ConfusionMode>,
    #[serde(default)]
    pub score_hist: ScoreHistConfig,
    #[serde(default)]
    pub energy: Option<EnergyStage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitStage {
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub preset: Option<InteractionType>,
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default)]
    pub keep: Vec<String>,
    #[serde(default)]
    pub define_cvn_max: bool,
}

/// A score column, given by name or as `{ name, suffix }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MethodEntry {
    Name(String),
    Spec {
        name: String,
        #[serde(default)]
        suffix: String,
        #[serde(default)]
        kind: String,
    },
}

impl MethodEntry {
    /// Score column of this method.
    pub fn column(&self) -> String {
        match self {
            MethodEntry::Name(name) => name.clone(),
            MethodEntry::Spec { name, suffix, kind } => {
                MethodConfig::new(kind.as_str(), name.as_str()).unique_name(suffix)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultsConfig {
    pub store: PathBuf,
    #[serde(default = "default_results_table")]
    pub table: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnergyStage {
    #[serde(default = "default_covariate")]
    pub covariate: String,
    pub edges: BinEdges,
}

fn default_tree() -> String {
    "events".to_string()
}

fn default_results_table() -> String {
    DEFAULT_RESULTS_TABLE.to_string()
}

fn default_covariate() -> String {
    DEFAULT_COVARIATE.to_string()
}

fn default_confusion_modes() -> Vec<ConfusionMode> {
    ConfusionMode::ALL.to_vec()
}

pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: RunConfig = if ext == "json" {
        serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid JSON config {}", path.display()))?
    } else {
        serde_yaml_ng::from_slice(&bytes)
            .with_context(|| format!("invalid YAML config {}", path.display()))?
    };
    Ok(cfg)
}

/// Split rules parsed from the config, checked before any data is read.
fn split_spec(stage: &SplitStage) -> Result<SplitSpec> {
    let mut spec = match (&stage.signal, stage.preset) {
        (Some(_), Some(_)) => bail!("split: 'signal' and 'preset' are mutually exclusive"),
        (Some(src), None) => SplitSpec::new(
            Expression::parse(src).with_context(|| format!("split: invalid signal '{src}'"))?,
        ),
        (None, Some(kind)) => SplitSpec::preset(kind)?,
        (None, None) => bail!("split: one of 'signal' or 'preset' is required"),
    };
    if stage.define_cvn_max && stage.preset.is_none() {
        bail!("split: 'define_cvn_max' requires a 'preset'");
    }
    if let Some(src) = &stage.exclude {
        spec = spec.with_exclusion(
            Expression::parse(src).with_context(|| format!("split: invalid exclude '{src}'"))?,
        );
    }
    Ok(spec.with_keep(stage.keep.clone()))
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.out_dir.as_os_str().is_empty() {
            bail!("'out_dir' must be non-empty");
        }
        if self.methods.is_empty() {
            bail!("'methods' must list at least one score column");
        }
        let columns: Vec<String> = self.methods.iter().map(MethodEntry::column).collect();
        for (i, c) in columns.iter().enumerate() {
            if c.is_empty() {
                bail!("method {i} has an empty name");
            }
            if columns[..i].contains(c) {
                bail!("method '{c}' listed twice");
            }
        }
        self.cut_scan.validate()?;
        self.score_hist.validate()?;
        if let Some(stage) = &self.split {
            split_spec(stage)?;
        }
        if let Some(results) = &self.results
            && results.table.is_empty()
        {
            bail!("results table name must be non-empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ConfusionSummary {
    method: String,
    cut: f64,
    counts: ConfusionCounts,
}

#[derive(Debug, Clone, Serialize)]
struct SeparationSummary {
    method: String,
    separation: f64,
}

#[derive(Debug, Clone, Serialize)]
struct RunSummary {
    version: String,
    out_dir: PathBuf,
    events: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    split: Option<SplitSummary>,
    optimal_cuts: Vec<OptimalCut>,
    confusion: Vec<ConfusionSummary>,
    separation: Vec<SeparationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy_store: Option<PathBuf>,
    artifacts: Vec<PathBuf>,
}

pub fn cmd_run(config_path: &Path) -> Result<()> {
    let cfg = read_run_config(config_path)?;
    cfg.validate()?;
    if !cfg.input.exists() {
        bail!("input {} does not exist", cfg.input.display());
    }
    let summary = run_pipeline(&cfg)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_pipeline(cfg: &RunConfig) -> Result<RunSummary> {
    let out_dir = if cfg.timestamped {
        mc_eval::create_timestamped_dir(&cfg.out_dir)?
    } else {
        std::fs::create_dir_all(&cfg.out_dir)
            .with_context(|| format!("failed to create {}", cfg.out_dir.display()))?;
        cfg.out_dir.clone()
    };
    let artifacts_dir = out_dir.join("artifacts");
    let mut artifacts = Vec::new();
    tracing::info!(out_dir = %out_dir.display(), "starting pipeline");

    // Split.
    let (events_dir, split) = match &cfg.split {
        Some(stage) => {
            let mut spec = split_spec(stage)?;
            let mut events = mc_table::load_events(&cfg.input, &cfg.tree)
                .with_context(|| format!("failed to load events from {}", cfg.input.display()))?;
            if stage.define_cvn_max
                && let Some(kind) = stage.preset
            {
                let column = mc_table::define_cvn_max(&mut events, kind)?;
                if !spec.keep.is_empty() && !spec.keep.contains(&column) {
                    spec.keep.push(column);
                }
            }
            let outcome = mc_table::split_events(&events, &spec)?;
            let dir = out_dir.join("filtered");
            mc_table::write_split(&outcome, &dir)?;
            (dir, Some(outcome.summary))
        }
        None => (cfg.input.clone(), None),
    };
    let store = TableStore::open(&events_dir)
        .with_context(|| format!("failed to open event store {}", events_dir.display()))?;
    let signal = store.read_table(SIGNAL_TABLE)?;
    let background = store.read_table(BACKGROUND_TABLE)?;

    let methods: Vec<String> = cfg.methods.iter().map(MethodEntry::column).collect();
    let scores = methods
        .iter()
        .map(|m| Ok((signal.f64_column(m)?.to_vec(), background.f64_column(m)?.to_vec())))
        .collect::<Result<Vec<_>>>()?;

    // Optimal cuts.
    let results = match &cfg.results {
        Some(r) => Some((TableStore::create(&r.store, WriteMode::Update)?, r.table.as_str())),
        None => None,
    };
    let mut optimal_cuts = Vec::with_capacity(methods.len());
    for (method, (sig, bkg)) in methods.iter().zip(&scores) {
        let solution = mc_eval::find_optimal_cut(method, sig, bkg, &cfg.cut_scan)
            .with_context(|| format!("optimal cut failed for '{method}'"))?;
        let path = artifacts_dir.join(artifact_file_name(method, "_cut_curve"));
        let artifact = CutCurveArtifact::from_solution(&solution, cfg.cut_scan.interpolation);
        mc_viz::write_artifact(&artifact, &path)?;
        artifacts.push(path);
        if let Some((log, table)) = &results {
            mc_eval::log_optimal_cut(log, table, &solution.optimum)?;
        }
        optimal_cuts.push(solution.optimum);
    }

    // Confusion matrices at the optimal cuts.
    let mut confusion = Vec::with_capacity(methods.len());
    for (opt, (sig, bkg)) in optimal_cuts.iter().zip(&scores) {
        let counts = ConfusionCounts::from_scores(sig, bkg, opt.cut)?;
        for &mode in &cfg.confusion_modes {
            let stem = format!("{}_confusion", opt.method);
            let path = artifacts_dir.join(artifact_file_name(&stem, mode.file_suffix()));
            mc_viz::write_artifact(
                &ConfusionMatrixArtifact::new(&opt.method, opt.cut, counts, mode),
                &path,
            )?;
            artifacts.push(path);
        }
        confusion.push(ConfusionSummary { method: opt.method.clone(), cut: opt.cut, counts });
    }

    // Score overlays.
    let mut separation = Vec::with_capacity(methods.len());
    for (method, (sig, bkg)) in methods.iter().zip(&scores) {
        let dist = mc_eval::score_distribution(method, sig, bkg, &cfg.score_hist)?;
        let stem = format!("{method}_scores");
        let path = artifacts_dir.join(artifact_file_name(&stem, dist.axis_scale.file_suffix()));
        mc_viz::write_artifact(&ScoreOverlayArtifact::from(&dist), &path)?;
        artifacts.push(path);
        separation.push(SeparationSummary { method: method.clone(), separation: dist.separation });
    }

    // Energy-binned performance and graphs.
    let energy_store = match &cfg.energy {
        Some(stage) => {
            let dir = out_dir.join("energy");
            let paths = run_energy_stage(stage, &signal, &background, &optimal_cuts, &dir)
                .with_context(|| format!("energy stage failed for {}", dir.display()))?;
            artifacts.extend(paths);
            Some(dir)
        }
        None => None,
    };

    let summary = RunSummary {
        version: mc_core::VERSION.to_string(),
        out_dir: out_dir.clone(),
        events: events_dir,
        split,
        optimal_cuts,
        confusion,
        separation,
        energy_store,
        artifacts,
    };
    let summary_path = out_dir.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    tracing::info!(summary = %summary_path.display(), "pipeline finished");
    Ok(summary)
}

fn run_energy_stage(
    stage: &EnergyStage,
    signal: &EventTable,
    background: &EventTable,
    optimal_cuts: &[OptimalCut],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let methods: Vec<MethodCut> = optimal_cuts
        .iter()
        .map(|o| MethodCut { method: o.method.clone(), cut: o.cut })
        .collect();
    let result = mc_eval::energy_binned_metrics(
        signal,
        background,
        &stage.covariate,
        &methods,
        &stage.edges,
    )?;
    let store = mc_eval::write_energy_bins(&result, dir)?;

    let mut paths = Vec::with_capacity(GraphType::ALL.len());
    for graph_type in GraphType::ALL {
        let graph = mc_eval::performance_graph_from_store(&store, &result.methods, graph_type)?;
        let path = dir.join(artifact_file_name("energy_performance", graph_type.suffix()));
        mc_viz::write_artifact(&EnergyPerformanceArtifact::new(graph, &stage.covariate), &path)?;
        paths.push(path);
    }
    Ok(paths)
}
