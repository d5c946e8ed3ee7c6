// Main entry point - Command line, logging and dependency wiring
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::sample_source::SampleSource;
use crate::infrastructure::config::{ConfigOverrides, DashboardConfig, SourceKind, load_dashboard_config};
use crate::infrastructure::crossterm_terminal::CrosstermTerminal;
use crate::infrastructure::instrument_source::InstrumentSource;
use crate::infrastructure::scpi;
use crate::infrastructure::shutdown;
use crate::infrastructure::synthetic_source::SyntheticSource;

#[derive(Parser, Debug)]
#[command(name = "dm3058e-dashboard")]
#[command(version, about = "Live voltage/current dashboard for the Rigol DM3058E", long_about = None)]
struct Cli {
    /// Seconds between updates
    #[arg(long)]
    interval: Option<f64>,

    /// Rolling window in seconds
    #[arg(long)]
    window: Option<f64>,

    /// Nominal voltage (V)
    #[arg(long, alias = "v_nom")]
    v_nom: Option<f64>,

    /// Nominal current (A)
    #[arg(long, alias = "i_nom")]
    i_nom: Option<f64>,

    /// ±V tolerance for 'Stable' status
    #[arg(long, alias = "v_tol")]
    v_tol: Option<f64>,

    /// Overcurrent threshold (A)
    #[arg(long, alias = "i_max")]
    i_max: Option<f64>,

    /// Sample source
    #[arg(long, value_parser = ["mock", "instrument"])]
    source: Option<String>,

    /// USBTMC device path or host[:port]; searched for when omitted
    #[arg(long)]
    resource: Option<String>,

    /// How current is obtained from the meter
    #[arg(long, value_parser = ["shunt", "alternate", "voltage"])]
    mode: Option<String>,

    /// Shunt value in ohms (shunt mode)
    #[arg(long, alias = "shunt_ohms")]
    shunt_ohms: Option<f64>,

    /// Print the identity of every USBTMC device and exit
    #[arg(long)]
    list: bool,

    /// Seed for the mock generator
    #[arg(long)]
    seed: Option<u64>,

    /// Disable colored output (also honoured via NO_COLOR)
    #[arg(long)]
    no_color: bool,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            interval_secs: self.interval,
            window_secs: self.window,
            v_nom: self.v_nom,
            i_nom: self.i_nom,
            v_tol: self.v_tol,
            i_max: self.i_max,
            source: self.source.clone(),
            resource: self.resource.clone(),
            mode: self.mode.clone(),
            shunt_ohms: self.shunt_ohms,
            no_color: self.no_color || std::env::var_os("NO_COLOR").is_some(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The dashboard owns stdout, so logs never go there
    init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let config = load_dashboard_config(&cli.overrides())?;
    tracing::debug!(?config, "configuration loaded");

    if cli.list {
        return list_resources(&config);
    }

    let source = build_source(&config, cli.seed)?;
    let shutdown = shutdown::install().context("failed to install signal handlers")?;

    let service = DashboardService::new(source, &config);
    let summary = service.run(CrosstermTerminal::acquire(), &shutdown)?;

    tracing::info!(
        ticks = summary.ticks,
        elapsed_secs = summary.elapsed_secs,
        last_status = ?summary.last_status,
        reason = ?summary.reason,
        "dashboard stopped"
    );
    Ok(())
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let log_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn list_resources(config: &DashboardConfig) -> anyhow::Result<()> {
    let reports = scpi::list_resources(Duration::from_millis(config.source.timeout_ms))
        .context("failed to enumerate USBTMC devices")?;
    if reports.is_empty() {
        println!("No USBTMC devices found.");
    }
    for report in &reports {
        println!("{}", report);
    }
    Ok(())
}

fn build_source(config: &DashboardConfig, seed: Option<u64>) -> anyhow::Result<Box<dyn SampleSource>> {
    match config.source.kind {
        SourceKind::Mock => Ok(Box::new(SyntheticSource::new(&config.thresholds, seed))),
        SourceKind::Instrument => {
            let timeout = Duration::from_millis(config.source.timeout_ms);
            let (session, identity) = scpi::connect(config.source.resource.as_deref(), timeout)
                .context("failed to connect to the DM3058E")?;
            tracing::info!("Connected to: {}", identity);
            Ok(Box::new(InstrumentSource::new(
                session,
                identity,
                config.source.mode,
                config.source.shunt_ohms,
            )))
        }
    }
}
