// Token Flow Runner
// Single simulations and stingy sweeps over seedable ChaCha8Rng runs
//
// Usage:
//   cargo run --release --bin tokenflow -- run -n 200              # Default model, 200 rounds
//   cargo run --release --bin tokenflow -- run -c sim.toml --json  # Config file, JSON summary
//   cargo run --release --bin tokenflow -- run --history h.jsonl --ledger l.jsonl
//   cargo run --release --bin tokenflow -- sweep --trials 20 -o sweep.json
//
// Log level follows RUST_LOG (default: info).

mod report;
mod sweep;
mod time_series;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokenflow_engine::SimConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use report::RunSummary;
use sweep::{run_sweep, SweepParams};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tokenflow", version, about = "Token flow simulation runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one simulation and print the final distribution
    Run(RunArgs),
    /// Sweep the stingy cap and group results by actual stingy count
    Sweep(SweepArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the node count
    #[arg(long)]
    nodes: Option<usize>,

    /// Seed the RNG (implies a reproducible run)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Number of trade rounds
    #[arg(short = 'n', long, default_value_t = 100)]
    iterations: usize,

    /// Write one JSON line per round
    #[arg(long)]
    history: Option<PathBuf>,

    /// Record transfers and write them as JSONL
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Print the summary as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SweepArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Rounds per trial
    #[arg(short = 'n', long, default_value_t = 50)]
    iterations: usize,

    /// Trials per stingy cap
    #[arg(long, default_value_t = 10)]
    trials: usize,

    /// Write the sweep report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_config(args: &ConfigArgs) -> anyhow::Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(n) = args.nodes {
        config.node_count = n;
    }
    if let Some(seed) = args.seed {
        config = config.seeded(seed);
    }
    config.validate()?;
    Ok(config)
}

// ─── Commands ───────────────────────────────────────────────────────────────

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;
    if args.ledger.is_some() {
        config.record_ledger = true;
    }
    let kind = config.model.kind();
    let output = tokenflow_engine::run(args.iterations, &config)?;

    if let Some(path) = &args.history {
        time_series::write_history(path, &output.history)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), rounds = output.history.len(), "history written");
    }
    if let (Some(path), Some(ledger)) = (&args.ledger, &output.ledger) {
        let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        ledger.write_jsonl(std::io::BufWriter::new(file))?;
        info!(path = %path.display(), entries = ledger.len(), "ledger written");
    }

    let summary = RunSummary::from_output(kind, &output);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }
    Ok(())
}

fn cmd_sweep(args: SweepArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let params = SweepParams {
        iterations: args.iterations,
        trials: args.trials,
        base_seed: config.seed,
    };
    let report = run_sweep(&config, &params)?;
    report.print();

    if let Some(path) = &args.output {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("  Results saved to: {}\n", path.display());
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run(args) => cmd_run(args),
        Command::Sweep(args) => cmd_sweep(args),
    }
}
