//! NAP-DKG CLI - Run in-memory ceremonies and inspect protocol parameters

mod metrics_csv;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use napdkg_core::group::{encode_point, encode_scalar};
use napdkg_party::{run_ceremony, DkgConfig, GroupKeyReference};
use napdkg_pbb::{BulletinBoard, CountingBoard, InMemoryBoard, Traffic};

use crate::metrics_csv::RunRow;
use crate::stats::PhaseSamples;

#[derive(Parser)]
#[command(name = "napdkg")]
#[command(about = "Publicly verifiable DKG over a public bulletin board", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the config file
#[derive(clap::Args)]
struct ThresholdArgs {
    /// Threshold (polynomial degree)
    #[arg(short, long)]
    t: Option<usize>,

    /// Number of parties
    #[arg(short, long)]
    n: Option<usize>,

    /// Liveness slack above the threshold
    #[arg(long)]
    fa: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run ceremonies on an in-memory board and print phase timings
    Run {
        #[command(flatten)]
        threshold: ThresholdArgs,

        /// Number of consecutive runs
        #[arg(short, long, default_value_t = 1)]
        iterations: usize,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Concurrent party tasks (defaults to n)
        #[arg(long)]
        max_workers: Option<usize>,

        /// Have every party poll the dealer topic itself
        #[arg(long)]
        no_poller: bool,

        /// Append one row of timings and board traffic per run to this CSV file
        #[arg(long)]
        metrics_csv: Option<PathBuf>,
    },

    /// Print the derived evaluation points and dual-code weights
    Params {
        #[command(flatten)]
        threshold: ThresholdArgs,
    },

    /// Write a config file with default values
    InitConfig {
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn resolve_config(path: Option<&PathBuf>, overrides: &ThresholdArgs) -> Result<DkgConfig> {
    let mut config = match path {
        Some(path) => DkgConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DkgConfig::default(),
    };
    let n_changed = overrides.n.is_some_and(|n| n != config.n);
    if let Some(t) = overrides.t {
        config.t = t;
    }
    if let Some(n) = overrides.n {
        config.n = n;
    }
    if let Some(fa) = overrides.fa {
        config.fa = fa;
    }
    if n_changed && path.is_none() {
        config.max_workers = config.n;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "napdkg=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            threshold,
            iterations,
            config,
            max_workers,
            no_poller,
            metrics_csv,
        } => {
            let mut config = resolve_config(config.as_ref(), &threshold)?;
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            if no_poller {
                config.use_dealer_poller = false;
            }
            config.validate()?;
            run(config, iterations, metrics_csv.as_deref()).await
        }

        Commands::Params { threshold } => {
            let config = resolve_config(None, &threshold)?;
            let pp = config.protocol_parameters()?;
            println!("Curve: {}", pp.group.curve);
            println!("t = {}, n = {}, deg m* = {}", pp.t, pp.n, pp.mstar_degree());
            println!("\nEvaluation points and weights:");
            for party in 0..pp.n as u16 {
                println!(
                    "  party {:>3}  α = {}  v = {}",
                    party,
                    encode_scalar(&pp.alpha_for_party(party)),
                    encode_scalar(&pp.weight_for_party(party)),
                );
            }
            Ok(())
        }

        Commands::InitConfig { output } => {
            if output.exists() {
                bail!("{} already exists", output.display());
            }
            DkgConfig::default().save(&output)?;
            println!("Wrote default config to {}", output.display());
            Ok(())
        }
    }
}

async fn run(
    config: DkgConfig,
    iterations: usize,
    csv_path: Option<&std::path::Path>,
) -> Result<()> {
    info!(
        "Running {} ceremonies with t={} n={} fa={}",
        iterations, config.t, config.n, config.fa
    );

    let counting = Arc::new(CountingBoard::new(Arc::new(InMemoryBoard::new())));
    let metrics = counting.metrics();
    let board: Arc<dyn BulletinBoard> = counting;
    let reference = Arc::new(GroupKeyReference::new());
    let mut samples = PhaseSamples::default();
    let mut traffic = [Traffic::default(); 4];
    let mut failed = 0usize;

    for iteration in 0..iterations {
        metrics.reset();
        let report = run_ceremony(config.clone(), Arc::clone(&board), Arc::clone(&reference)).await?;

        for (index, err) in report.failures() {
            println!("  run {}: party {} failed: {}", iteration, index, err);
            failed += 1;
        }
        let timings: Vec<_> = report.successes().map(|p| p.timings).collect();
        for t in &timings {
            samples.push(*t);
        }
        for (slot, (_, phase)) in traffic.iter_mut().zip(metrics.snapshot()) {
            *slot = *slot + phase;
        }
        if let Some(path) = csv_path {
            let row = RunRow::new(&config, iteration, report.run_id.to_string(), &timings, &metrics);
            metrics_csv::append(path, &row)
                .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        }

        match report.agreed_group_key() {
            Some(key) => println!(
                "Run {} ({:?}): group key {}",
                iteration,
                report.elapsed,
                encode_point(&key)
            ),
            None => println!("Run {} ({:?}): parties disagree on the group key", iteration, report.elapsed),
        }
    }

    if samples.is_empty() {
        bail!("No party completed a run");
    }

    println!("\nPer-party phase timings:");
    for (phase, summary) in samples.rows() {
        println!("  {:<15} {}", phase, summary);
    }

    println!("\nBoard traffic per run (all parties):");
    println!(
        "  {:<15} {:>10} {:>12} {:>10} {:>12} {:>8}",
        "phase", "msgs out", "bytes out", "msgs in", "bytes in", "fetches"
    );
    let runs = iterations.max(1) as u64;
    for (phase, total) in napdkg_pbb::Phase::ALL.iter().zip(traffic) {
        println!(
            "  {:<15} {:>10} {:>12} {:>10} {:>12} {:>8}",
            phase.name(),
            total.msgs_out / runs,
            total.bytes_out / runs,
            total.msgs_in / runs,
            total.bytes_in / runs,
            total.fetches / runs,
        );
    }
    if let Some(path) = csv_path {
        println!("\nMetrics appended to {}", path.display());
    }
    if failed > 0 {
        println!("\n{} party runs failed", failed);
    }
    Ok(())
}
