//! Fleetwatch CLI entry point.
//!
//! One-shot monitoring runs: probe a single host or the whole fleet,
//! print the summary and deductions, and always exit 0 for a completed
//! run — probe failures are alerts and deductions, not process failure.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use fleetwatch::config::FleetConfig;
use fleetwatch::orchestrator::Orchestrator;
use fleetwatch::pipeline::ProbeStack;
use fleetwatch::probe::http::ReqwestProber;
use fleetwatch::probe::ssh::OpenSshExecutor;
use fleetwatch::probe::tcp::TokioTcpProber;
use fleetwatch::store::StateStore;
use fleetwatch::{logging, report};

/// Layered host-fleet health monitor.
#[derive(Debug, Parser)]
#[command(name = "fleetwatch", version, about)]
struct Cli {
    /// Host identifier to check, or `all` for the whole fleet.
    #[arg(default_value = "all")]
    target: String,

    /// Print persisted state without probing.
    #[arg(long)]
    status: bool,

    /// Emit the run report as JSON instead of the text summary.
    #[arg(long)]
    json: bool,

    /// Fleet config path (default: $FLEETWATCH_CONFIG or ./fleet.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// State file path (default: $FLEETWATCH_STATE or the platform data dir).
    #[arg(long)]
    state: Option<PathBuf>,

    /// Enable rotating JSON file logs in this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = match cli.log_dir.as_deref() {
        Some(dir) => Some(logging::init_with_file(dir).context("failed to set up file logging")?),
        None => {
            logging::init_console();
            None
        }
    };

    let fleet = FleetConfig::load(cli.config.as_deref())?;
    let state_path = fleet.resolve_state_path(cli.state.as_deref());

    if cli.status {
        let store = StateStore::open(&state_path)?;
        print!("{}", report::render_status(&store.load()));
        return Ok(());
    }

    let stack = ProbeStack {
        http: Arc::new(ReqwestProber::new().context("failed to build HTTP prober")?),
        tcp: Arc::new(TokioTcpProber),
        remote: Arc::new(OpenSshExecutor),
    };
    let orchestrator = Orchestrator::new(fleet, stack);

    let targets = if cli.target == "all" {
        orchestrator.all_host_ids()
    } else {
        vec![cli.target.clone()]
    };

    let store = StateStore::open(&state_path)?;
    let run = orchestrator.run(&store, &targets).await?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&run).context("failed to serialize run report")?
        );
    } else {
        print!("{}", report::render_run(&run));
    }

    Ok(())
}
