//! mvacut CLI

mod convert;
mod run;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use mc_eval::{
    AxisScale, BinEdges, ClassScores, ConfusionCounts, ConfusionMode, CutScanConfig,
    DEFAULT_COVARIATE, DEFAULT_RESULTS_TABLE, GraphType, Interpolation, MethodCut, ModelFile,
    ModelReader, ScoreHistConfig,
};
use mc_table::{
    DEFAULT_KEY_COLUMN, Expression, InteractionType, SplitSpec, TableStore, WriteMode,
};
use mc_viz::{ConfusionMatrixArtifact, CutCurveArtifact, ScoreOverlayArtifact};

#[derive(Parser)]
#[command(name = "mvacut")]
#[command(about = "mvacut - classifier threshold optimization and performance evaluation")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split events into `Signal` and `Background` tables of a new store
    Split {
        /// Event source (store directory, .parquet, .csv or .tsv)
        #[arg(short, long)]
        input: PathBuf,

        /// Table to read when the input is a store directory
        #[arg(long, default_value = "events")]
        tree: String,

        /// Output store directory (recreated)
        #[arg(short, long)]
        output: PathBuf,

        /// Signal expression, e.g. `(TrueNuPdg == 14 || TrueNuPdg == -14) && IsCC`
        #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
        signal: Option<String>,

        /// Interaction preset (nue, numu, nc)
        #[arg(long)]
        preset: Option<InteractionType>,

        /// Exclusion filter; rows failing it are dropped. Presets default to
        /// `CVNScoreNuE != -999`.
        #[arg(long)]
        exclude: Option<String>,

        /// Columns to keep (comma-separated). Default: all.
        #[arg(long, value_delimiter = ',')]
        keep: Vec<String>,

        /// Add the `CVNMax_<type>` column for the preset before splitting
        #[arg(long, requires = "preset")]
        define_cvn_max: bool,

        /// Write the split summary here instead of stdout
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Import a CSV file into a store, or export a store table to CSV
    Convert {
        /// CSV/TSV file, or store directory with `--to-csv`
        #[arg(short, long)]
        input: PathBuf,

        /// Table name
        #[arg(long, default_value = "events")]
        tree: String,

        /// Store directory, or CSV file with `--to-csv`
        #[arg(short, long)]
        output: PathBuf,

        /// Export instead of import
        #[arg(long)]
        to_csv: bool,
    },

    /// Find the FoM-maximizing threshold of a score column
    OptimalCut {
        /// Store with `Signal` and `Background` tables
        #[arg(short, long)]
        input: PathBuf,

        /// Score column
        #[arg(long)]
        method: String,

        /// Histogram bins
        #[arg(long, default_value = "1000")]
        bins: usize,

        /// Lowest score
        #[arg(long, default_value = "-1.0", allow_hyphen_values = true)]
        min: f64,

        /// Highest score
        #[arg(long, default_value = "1.0", allow_hyphen_values = true)]
        max: f64,

        /// Interpolation (natural, monotone, linear)
        #[arg(long, default_value = "natural")]
        interpolation: Interpolation,

        /// Results store to upsert the optimum into
        #[arg(long)]
        results: Option<PathBuf>,

        /// Results table
        #[arg(long, default_value = DEFAULT_RESULTS_TABLE)]
        results_table: String,

        /// Write the cut-curve artifact here
        #[arg(long)]
        curve: Option<PathBuf>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Confusion matrix at a fixed threshold
    Confusion {
        /// Store with `Signal` and `Background` tables
        #[arg(short, long)]
        input: PathBuf,

        /// Score column
        #[arg(long)]
        method: String,

        /// Threshold (`score > cut` passes)
        #[arg(long, allow_hyphen_values = true)]
        cut: f64,

        /// Normalization (counts, efficiency, purity)
        #[arg(long, default_value = "counts")]
        mode: ConfusionMode,

        /// Output file for the artifact (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Signal/background score overlay
    ScoreHist {
        /// Store with `Signal` and `Background` tables
        #[arg(short, long)]
        input: PathBuf,

        /// Score column
        #[arg(long)]
        method: String,

        /// Histogram bins
        #[arg(long, default_value = "50")]
        bins: usize,

        /// Lower edge
        #[arg(long, default_value = "-1.0", allow_hyphen_values = true)]
        min: f64,

        /// Upper edge
        #[arg(long, default_value = "1.0", allow_hyphen_values = true)]
        max: f64,

        /// Y-axis scale (linear, logy)
        #[arg(long, default_value = "linear")]
        axis_scale: AxisScale,

        /// Output file for the artifact (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-energy-bin performance of several methods into a `data` table
    EnergyBins {
        /// Store with `Signal` and `Background` tables
        #[arg(short, long)]
        input: PathBuf,

        /// Output store directory (recreated)
        #[arg(short, long)]
        output: PathBuf,

        /// Binning covariate
        #[arg(long, default_value = DEFAULT_COVARIATE)]
        covariate: String,

        /// Method and threshold as `name=cut` (repeatable)
        #[arg(long = "method", required = true, value_parser = parse_key_value::<f64>)]
        methods: Vec<(String, f64)>,

        /// Bin edges (comma-separated, strictly increasing)
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        edges: Vec<f64>,
    },

    /// Performance-vs-energy graph from a `data` table
    EnergyGraph {
        /// Store holding the `data` table
        #[arg(short, long)]
        input: PathBuf,

        /// Methods (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        methods: Vec<String>,

        /// Quantity (eff, pur, fom)
        #[arg(long, default_value = "eff")]
        graph: GraphType,

        /// X-axis label
        #[arg(long, default_value = DEFAULT_COVARIATE)]
        x_label: String,

        /// Output file for the artifact (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Insert or update a keyed row of a results table
    Upsert {
        /// Results store directory (created if missing)
        #[arg(long)]
        store: PathBuf,

        /// Table name
        #[arg(long, default_value = DEFAULT_RESULTS_TABLE)]
        table: String,

        /// Key column
        #[arg(long, default_value = DEFAULT_KEY_COLUMN)]
        key_column: String,

        /// Key value
        #[arg(long)]
        key: String,

        /// Field as `name=value` (repeatable)
        #[arg(long = "set", required = true, value_parser = parse_key_value::<f64>)]
        values: Vec<(String, f64)>,
    },

    /// Score a table with trained models
    Apply {
        /// Event source (store directory, .parquet, .csv or .tsv)
        #[arg(short, long)]
        input: PathBuf,

        /// Table to read and write
        #[arg(long, default_value = "events")]
        tree: String,

        /// Model as `name=path/to/model.weights.json` (repeatable)
        #[arg(long = "model", value_parser = parse_key_value::<PathBuf>)]
        models: Vec<(String, PathBuf)>,

        /// Trained method name, resolved to
        /// `<weights-dir>/models/weights/<job>_<name>.weights.json` (repeatable)
        #[arg(long = "method", requires = "weights_dir")]
        methods: Vec<String>,

        /// Training output directory used to resolve `--method`
        #[arg(long)]
        weights_dir: Option<PathBuf>,

        /// Training job name used to resolve `--method`
        #[arg(long, default_value = "TMVAClassification")]
        job: String,

        /// Input variables (comma-separated). Default: the models' inputs.
        #[arg(long, value_delimiter = ',')]
        variables: Vec<String>,

        /// Spectator columns that must be present (comma-separated)
        #[arg(long, value_delimiter = ',')]
        spectators: Vec<String>,

        /// Threshold for the `<method>_output` column
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        cut: f64,

        /// Output store directory (table written under `--tree`)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run the full pipeline from a YAML/JSON config
    Run {
        /// Pipeline config (`.yaml`/`.yml` or `.json`)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Split {
            input,
            tree,
            output,
            signal,
            preset,
            exclude,
            keep,
            define_cvn_max,
            summary,
        } => cmd_split(
            &input,
            &tree,
            &output,
            signal.as_deref(),
            preset,
            exclude.as_deref(),
            keep,
            define_cvn_max,
            summary.as_ref(),
        ),
        Commands::Convert { input, tree, output, to_csv } => {
            if to_csv {
                convert::cmd_export_csv(&input, &tree, &output)
            } else {
                convert::cmd_import_csv(&input, &tree, &output)
            }
        }
        Commands::OptimalCut {
            input,
            method,
            bins,
            min,
            max,
            interpolation,
            results,
            results_table,
            curve,
            output,
        } => {
            let config = CutScanConfig {
                n_bins: bins,
                min_score: min,
                max_score: max,
                interpolation,
                ..Default::default()
            };
            cmd_optimal_cut(
                &input,
                &method,
                &config,
                results.as_deref(),
                &results_table,
                curve.as_deref(),
                output.as_ref(),
            )
        }
        Commands::Confusion { input, method, cut, mode, output } => {
            cmd_confusion(&input, &method, cut, mode, output.as_ref())
        }
        Commands::ScoreHist { input, method, bins, min, max, axis_scale, output } => {
            let config = ScoreHistConfig { n_bins: bins, min, max, axis_scale };
            cmd_score_hist(&input, &method, &config, output.as_ref())
        }
        Commands::EnergyBins { input, output, covariate, methods, edges } => {
            cmd_energy_bins(&input, &output, &covariate, methods, edges)
        }
        Commands::EnergyGraph { input, methods, graph, x_label, output } => {
            cmd_energy_graph(&input, &methods, graph, &x_label, output.as_ref())
        }
        Commands::Upsert { store, table, key_column, key, values } => {
            cmd_upsert(&store, &table, &key_column, &key, &values)
        }
        Commands::Apply {
            input,
            tree,
            mut models,
            methods,
            weights_dir,
            job,
            variables,
            spectators,
            cut,
            output,
        } => {
            if let Some(dir) = &weights_dir {
                for m in methods {
                    let path = mc_eval::weights_path(dir, &job, &m);
                    models.push((m, path));
                }
            }
            if models.is_empty() {
                anyhow::bail!("apply: give at least one --model or --method");
            }
            cmd_apply(&input, &tree, &models, variables, &spectators, cut, &output)
        }
        Commands::Run { config } => run::cmd_run(&config),
        Commands::Version => {
            println!("mvacut {}", mc_core::VERSION);
            Ok(())
        }
    }
}

/// Parse `name=value`.
fn parse_key_value<T>(s: &str) -> std::result::Result<(String, T), String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let (name, value) =
        s.split_once('=').ok_or_else(|| format!("expected 'name=value', got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty name in '{s}'"));
    }
    let value = value.trim().parse::<T>().map_err(|e| format!("bad value in '{s}': {e}"))?;
    Ok((name.to_string(), value))
}

fn parse_expression(source: &str, what: &str) -> Result<Expression> {
    Expression::parse(source).with_context(|| format!("invalid {what} expression '{source}'"))
}

#[allow(clippy::too_many_arguments)]
fn cmd_split(
    input: &Path,
    tree: &str,
    output: &Path,
    signal: Option<&str>,
    preset: Option<InteractionType>,
    exclude: Option<&str>,
    mut keep: Vec<String>,
    define_cvn_max: bool,
    summary: Option<&PathBuf>,
) -> Result<()> {
    let mut spec = match (signal, preset) {
        (Some(src), _) => SplitSpec::new(parse_expression(src, "signal")?),
        (None, Some(kind)) => SplitSpec::preset(kind)?,
        (None, None) => anyhow::bail!("either --signal or --preset is required"),
    };
    if let Some(src) = exclude {
        spec = spec.with_exclusion(parse_expression(src, "exclusion")?);
    }

    let mut events = mc_table::load_events(input, tree)
        .with_context(|| format!("failed to load events from {}", input.display()))?;
    if define_cvn_max && let Some(kind) = preset {
        let column = mc_table::define_cvn_max(&mut events, kind)?;
        tracing::info!(column = column.as_str(), "defined CVN max column");
        if !keep.is_empty() && !keep.contains(&column) {
            keep.push(column);
        }
    }
    spec = spec.with_keep(keep);

    let outcome = mc_table::split_events(&events, &spec)?;
    mc_table::write_split(&outcome, output)
        .with_context(|| format!("failed to write split to {}", output.display()))?;
    write_json(summary, serde_json::to_value(outcome.summary)?)
}

fn open_store(path: &Path) -> Result<TableStore> {
    TableStore::open(path).with_context(|| format!("failed to open store {}", path.display()))
}

fn cmd_optimal_cut(
    input: &Path,
    method: &str,
    config: &CutScanConfig,
    results: Option<&Path>,
    results_table: &str,
    curve: Option<&Path>,
    output: Option<&PathBuf>,
) -> Result<()> {
    config.validate()?;
    let store = open_store(input)?;
    let solution = mc_eval::optimal_cut_from_store(&store, method, config)?;

    let mut out = serde_json::to_value(&solution.optimum)?;
    if let Some(path) = results {
        let log = TableStore::create(path, WriteMode::Update)?;
        let outcome = mc_eval::log_optimal_cut(&log, results_table, &solution.optimum)?;
        out["results_outcome"] = serde_json::to_value(outcome)?;
    }
    if let Some(path) = curve {
        let artifact = CutCurveArtifact::from_solution(&solution, config.interpolation);
        mc_viz::write_artifact(&artifact, path)?;
    }
    write_json(output, out)
}

fn cmd_confusion(
    input: &Path,
    method: &str,
    cut: f64,
    mode: ConfusionMode,
    output: Option<&PathBuf>,
) -> Result<()> {
    let scores = ClassScores::from_store(&open_store(input)?, method)?;
    let counts = ConfusionCounts::from_scores(&scores.signal, &scores.background, cut)?;
    let artifact = ConfusionMatrixArtifact::new(method, cut, counts, mode);
    write_json(output, serde_json::to_value(&artifact)?)
}

fn cmd_score_hist(
    input: &Path,
    method: &str,
    config: &ScoreHistConfig,
    output: Option<&PathBuf>,
) -> Result<()> {
    config.validate()?;
    let scores = ClassScores::from_store(&open_store(input)?, method)?;
    let dist = mc_eval::score_distribution(method, &scores.signal, &scores.background, config)?;
    write_json(output, serde_json::to_value(ScoreOverlayArtifact::from(&dist))?)
}

fn cmd_energy_bins(
    input: &Path,
    output: &Path,
    covariate: &str,
    methods: Vec<(String, f64)>,
    edges: Vec<f64>,
) -> Result<()> {
    let edges = BinEdges::new(edges)?;
    let methods: Vec<MethodCut> =
        methods.into_iter().map(|(method, cut)| MethodCut { method, cut }).collect();
    let store = open_store(input)?;
    let signal = store.read_table(mc_table::SIGNAL_TABLE)?;
    let background = store.read_table(mc_table::BACKGROUND_TABLE)?;

    let result = mc_eval::energy_binned_metrics(&signal, &background, covariate, &methods, &edges)?;
    mc_eval::write_energy_bins(&result, output)
        .with_context(|| format!("failed to write energy bins to {}", output.display()))?;
    write_json(
        None,
        serde_json::json!({
            "output": output,
            "covariate": result.covariate,
            "methods": result.methods,
            "n_bins": result.rows.len(),
        }),
    )
}

fn cmd_energy_graph(
    input: &Path,
    methods: &[String],
    graph: GraphType,
    x_label: &str,
    output: Option<&PathBuf>,
) -> Result<()> {
    let graph = mc_eval::performance_graph_from_store(&open_store(input)?, methods, graph)?;
    let artifact = mc_viz::EnergyPerformanceArtifact::new(graph, x_label);
    write_json(output, serde_json::to_value(&artifact)?)
}

fn cmd_upsert(
    store: &Path,
    table: &str,
    key_column: &str,
    key: &str,
    values: &[(String, f64)],
) -> Result<()> {
    let store = TableStore::create(store, WriteMode::Update)?;
    let outcome = mc_table::upsert_by_key(&store, table, key_column, key, values)?;
    write_json(
        None,
        serde_json::json!({ "table": table, "key": key, "outcome": outcome }),
    )
}

fn cmd_apply(
    input: &Path,
    tree: &str,
    models: &[(String, PathBuf)],
    variables: Vec<String>,
    spectators: &[String],
    cut: f64,
    output: &Path,
) -> Result<()> {
    let mut reader = ModelReader::new();
    let variables = if variables.is_empty() {
        let mut inputs = Vec::new();
        for (_, path) in models {
            inputs.extend(ModelFile::load(path)?.inputs);
        }
        inputs
    } else {
        variables
    };
    for v in &variables {
        reader.add_variable(v);
    }
    for s in spectators {
        reader.add_spectator(s);
    }
    for (name, path) in models {
        reader.book_method(name, path)?;
    }

    let mut events = mc_table::load_events(input, tree)
        .with_context(|| format!("failed to load events from {}", input.display()))?;
    let mut passed = serde_json::Map::new();
    for (name, _) in models {
        let n = reader.apply_to_table(&mut events, name, cut)?;
        passed.insert(name.clone(), n.into());
    }

    let store = TableStore::create(output, WriteMode::Update)?;
    store.write_table(&events)?;
    write_json(
        None,
        serde_json::json!({
            "output": output,
            "table": events.name(),
            "rows": events.n_rows(),
            "cut": cut,
            "passed": passed,
        }),
    )
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
