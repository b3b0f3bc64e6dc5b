// Entry point and high-level CLI flow.
//
// - `cleanse` turns each source's raw files into a standardized table.
// - `reconcile` joins the standardized tables, stops on any cross-source
//   disagreement, merges and validates against the season reference.
// - `check` runs every check without stopping and prints a pass/fail table.
// With no subcommand the binary cleanses every configured source and then
// reconciles.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use efl_unify::cleanse::run_sources;
use efl_unify::config::PipelineConfig;
use efl_unify::loader::{load_sources, load_standardized};
use efl_unify::logging::init_logging;
use efl_unify::output::preview_table;
use efl_unify::reconcile::{diagnose, Reconciler, SourceTables};
use efl_unify::reference::SeasonReference;
use efl_unify::reports::season_summary;
use efl_unify::types::Source;

#[derive(Parser, Debug)]
#[command(name = "efl_unify")]
#[command(about = "Cleanse and reconcile historical English league match data")]
#[command(version)]
struct Args {
    /// Pipeline configuration file (TOML)
    #[arg(short, long, env = "EFL_UNIFY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cleanse raw files into standardized per-source tables
    Cleanse {
        /// Only this source (default: every configured source)
        #[arg(long)]
        source: Option<Source>,
    },
    /// Reconcile the standardized tables into the unified dataset
    Reconcile,
    /// Run every check without stopping and report pass/fail
    Check {
        /// Only this source's table
        #[arg(long)]
        source: Option<Source>,
    },
}

fn cleanse(config: &PipelineConfig, source: Option<Source>) -> anyhow::Result<()> {
    let sources = match source {
        Some(s) => vec![s],
        None => config.sources.clone(),
    };
    let reports = run_sources(config, &sources).context("cleansing failed")?;
    preview_table("Cleansing Summary", None, &reports, reports.len());
    for r in reports.iter().filter(|r| !r.unmapped_clubs.is_empty()) {
        println!("{} unmapped clubs: {}", r.source, r.unmapped_clubs.join(", "));
    }
    Ok(())
}

fn reconcile(config: &PipelineConfig) -> anyhow::Result<()> {
    let reference = SeasonReference::from_path(&config.reference_data_path)
        .context("loading season reference")?;
    let mut reconciler = Reconciler::new(config, &reference);
    let outcome = reconciler.run().context("reconciliation failed")?;

    let rows = season_summary(&outcome.unified);
    preview_table(
        "Season Summary",
        Some("first 10 season/tier groups"),
        &rows,
        10,
    );
    println!(
        "(Full table exported to {})\n",
        config.unified_output_path.display()
    );
    println!("Summary Stats ({}):", config.summary_path.display());
    println!("{}\n", serde_json::to_string_pretty(&outcome.summary)?);
    Ok(())
}

/// Returns whether every check passed.
fn check(config: &PipelineConfig, source: Option<Source>) -> anyhow::Result<bool> {
    let tables: SourceTables = match source {
        Some(s) => {
            let rows = load_standardized(&config.cleansed_path(s), s)?;
            SourceTables::from([(s, rows)])
        }
        None => load_sources(config)?,
    };
    let reference = SeasonReference::from_path(&config.reference_data_path)
        .context("loading season reference")?;
    let results = diagnose(config, &reference, &tables)?;
    preview_table("Check Results", None, &results, results.len());
    Ok(results.iter().all(|r| r.result == "pass"))
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = match PipelineConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match init_logging(&config.log_dir) {
        Ok(path) => info!("Logging to {}", path.display()),
        Err(e) => eprintln!("Logging disabled: {}", e),
    }

    let result = match args.command {
        Some(Command::Cleanse { source }) => cleanse(&config, source).map(|_| true),
        Some(Command::Reconcile) => reconcile(&config).map(|_| true),
        Some(Command::Check { source }) => check(&config, source),
        None => cleanse(&config, None).and_then(|_| reconcile(&config)).map(|_| true),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("One or more checks failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
