//! Binary entry point for the tsbs benchmark driver.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tsbs_runner::{
    logging,
    manifest::RunManifest,
    naming::mode_label,
    paths::dir_suffix,
    ConfigOverrides, DriverConfig, ExecutionMode, Orchestrator, PhaseRunner, ProcessLauncher,
    ResourceSampler, RunReport,
};

#[derive(Parser, Debug)]
#[command(
    name = "tsbs-runner",
    version,
    about = "Drives the tsbs benchmark executable through its workload phases",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "TSBS_RUNNER_CONFIG",
        value_name = "FILE",
        help = "TOML config file (defaults to the per-user config when present)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "TSBS_BENCHMARK_PATH",
        value_name = "DIR",
        help = "Directory holding the executable, working directories and results"
    )]
    benchmark_path: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "TSBS_DATASET_PATH",
        value_name = "DIR",
        help = "Directory holding the source dataset files"
    )]
    dataset_path: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "TSBS_EXECUTABLE",
        value_name = "FILE",
        help = "Benchmark executable (defaults to <benchmark-path>/tsbs)"
    )]
    executable: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "MS",
        help = "Resource sampling interval in milliseconds"
    )]
    sample_interval_ms: Option<u64>,

    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log filter used when RUST_LOG is unset"
    )]
    log_level: String,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for the final report"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct ModeArgs {
    #[arg(long, help = "Operate in full-database mode (-f)")]
    full: bool,

    #[arg(long, help = "Operate in bitmap-only mode (-b)")]
    bitmap: bool,

    #[arg(long, help = "Randomize query time ranges (-m)")]
    randomize_ranges: bool,
}

impl From<ModeArgs> for ExecutionMode {
    fn from(args: ModeArgs) -> Self {
        ExecutionMode {
            full_database: args.full,
            bitmap_only: args.bitmap,
            randomized_range: args.randomize_ranges,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Run every phase for the hybrid, then the full-database branch")]
    Run {
        #[arg(long, help = "Randomize query time ranges (-m)")]
        randomize_ranges: bool,
    },

    #[command(about = "Run a single phase for one execution mode")]
    Phase {
        #[arg(value_enum)]
        phase: PhaseArg,

        #[command(flatten)]
        mode: ModeArgs,
    },

    #[command(about = "Insert the largest dataset with checkpoints disabled, then printed")]
    Checkpoint {
        #[command(flatten)]
        mode: ModeArgs,
    },

    #[command(about = "Run the configured queries under the resource sampler")]
    QueryResource {
        #[command(flatten)]
        mode: ModeArgs,
    },

    #[command(about = "Print the dataset matrix and execution modes")]
    Matrix,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "kebab_case")]
enum PhaseArg {
    FreshInsert,
    Query,
    Reinsert,
    Mixed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct PhaseOutcome {
    phase: &'static str,
    mode: ExecutionMode,
    label: String,
    exit_code: i32,
}

#[derive(Debug, Serialize)]
struct MatrixView {
    datasets: Vec<DatasetRow>,
    modes: Vec<ModeRow>,
}

#[derive(Debug, Serialize)]
struct DatasetRow {
    position: usize,
    name: String,
    rows: u64,
    scale: u32,
}

#[derive(Debug, Serialize)]
struct ModeRow {
    mode: ExecutionMode,
    label: String,
    dir_suffix: String,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(process_exit_code(code)),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32, Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;
    let config = load_config(&cli)?;
    let mut launcher = ProcessLauncher::new(ResourceSampler::new(config.sample_interval));

    let code = match cli.command {
        Command::Run { .. } => {
            let runner = PhaseRunner::new(&config, &mut launcher);
            runner.prepare()?;
            let manifest = RunManifest::collect(&config).write(runner.namer().dir())?;
            info!(manifest = %manifest.display(), "wrote run manifest");
            let report = Orchestrator::new(runner).run()?;
            emit(cli.format, &report, || print_run_text(&report))?;
            report.exit_code
        }
        Command::Phase { phase, mode } => {
            let mode = ExecutionMode::from(mode);
            let mut runner = PhaseRunner::new(&config, &mut launcher);
            runner.prepare()?;
            let (name, code) = match phase {
                PhaseArg::FreshInsert => ("fresh-insert", runner.fresh_insert(mode)?),
                PhaseArg::Query => ("query", runner.query(mode)?),
                PhaseArg::Reinsert => ("reinsert", runner.reinsert(mode)?),
                PhaseArg::Mixed => ("mixed", runner.mixed(mode)?),
            };
            report_phase(cli.format, name, mode, code)?
        }
        Command::Checkpoint { mode } => {
            let mode = ExecutionMode::from(mode);
            let mut runner = PhaseRunner::new(&config, &mut launcher);
            runner.prepare()?;
            let code = runner.checkpoint_comparison(mode)?;
            report_phase(cli.format, "checkpoint", mode, code)?
        }
        Command::QueryResource { mode } => {
            let mode = ExecutionMode::from(mode);
            let mut runner = PhaseRunner::new(&config, &mut launcher);
            runner.prepare()?;
            let code = runner.query_resource(mode)?;
            report_phase(cli.format, "query-resource", mode, code)?
        }
        Command::Matrix => {
            let view = matrix_view(&config);
            emit(cli.format, &view, || print_matrix_text(&view))?;
            0
        }
    };
    Ok(code)
}

fn load_config(cli: &Cli) -> Result<DriverConfig, Box<dyn Error>> {
    let mut overrides = ConfigOverrides {
        benchmark_path: cli.benchmark_path.clone(),
        dataset_path: cli.dataset_path.clone(),
        executable: cli.executable.clone(),
        sample_interval_ms: cli.sample_interval_ms,
        randomize_ranges: matches!(
            cli.command,
            Command::Run {
                randomize_ranges: true
            }
        ),
    };
    if matches!(cli.command, Command::Matrix) {
        // Listing the matrix touches no directories.
        overrides.benchmark_path.get_or_insert_with(|| PathBuf::from("."));
        overrides.dataset_path.get_or_insert_with(|| PathBuf::from("."));
    }
    Ok(DriverConfig::load(cli.config.clone(), overrides)?)
}

fn process_exit_code(code: i32) -> i32 {
    if (0..=255).contains(&code) {
        code
    } else {
        1
    }
}

fn report_phase(
    format: OutputFormat,
    phase: &'static str,
    mode: ExecutionMode,
    exit_code: i32,
) -> Result<i32, Box<dyn Error>> {
    let outcome = PhaseOutcome {
        phase,
        mode,
        label: mode_label(mode),
        exit_code,
    };
    emit(format, &outcome, || {
        println!(
            "{} ({}) finished with exit code {}",
            outcome.phase, outcome.label, outcome.exit_code
        )
    })?;
    Ok(exit_code)
}

fn matrix_view(config: &DriverConfig) -> MatrixView {
    MatrixView {
        datasets: config
            .matrix
            .positioned()
            .map(|(position, ds)| DatasetRow {
                position,
                name: ds.name.clone(),
                rows: ds.rows,
                scale: ds.scale,
            })
            .collect(),
        modes: ExecutionMode::all()
            .into_iter()
            .map(|mode| ModeRow {
                mode,
                label: mode_label(mode),
                dir_suffix: dir_suffix(mode),
            })
            .collect(),
    }
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_run_text(report: &RunReport) {
    for branch in &report.branches {
        println!(
            "{} branch: reached {} (exit code {})",
            if branch.full_database { "full-database" } else { "hybrid" },
            branch.reached,
            branch.exit_code
        );
        for stage in &branch.stages {
            println!("  {:<20} exit={}", stage.stage.to_string(), stage.exit_code);
        }
    }
    println!("Run finished with exit code {}", report.exit_code);
}

fn print_matrix_text(view: &MatrixView) {
    println!("Datasets:");
    for ds in &view.datasets {
        println!(
            "  {}. {} rows={} scale={}",
            ds.position, ds.name, ds.rows, ds.scale
        );
    }
    println!();
    println!("Execution modes:");
    for mode in &view.modes {
        println!("  {:<18} dir_suffix='{}'", mode.label, mode.dir_suffix);
    }
}
