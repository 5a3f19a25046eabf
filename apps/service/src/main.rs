mod app;
mod bus;
mod config;
mod probe;
mod registry;
mod scheduler;
mod stats;
mod store;
mod transfer;
mod update;
mod validation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use app::App;
use bus::CoreEvent;
use config::Config;
use registry::site::HISTORY_LIMIT;

#[derive(Parser)]
#[command(name = "pingmon", version, about = "Uptime and latency monitor for a list of sites")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the store path from the config file
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the periodic sweep loop (default)
    Run,
    /// Probe every site once and print the resulting statistics
    Sweep,
    /// Add a site to the registry and probe it
    Add { name: String, url: String },
    /// Write the current site list as an export document
    Export { path: PathBuf },
    /// Replace the site list from an export document or URL list
    Import { path: PathBuf },
    /// Print the effective configuration and exit
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();

    let cli = Cli::parse();
    let mut config = Config::from_config(cli.config.as_deref()).context("loading configuration")?;
    if let Some(store) = cli.store {
        config.store.path = store;
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Config => println!("{config}"),
        Command::Run => run(App::bootstrap(config).await?).await?,
        Command::Sweep => sweep_once(App::bootstrap(config).await?).await,
        Command::Add { name, url } => {
            let app = App::bootstrap(config).await?;
            app.add_site(&name, &url).await?;
            let registry = app.registry.lock().await;
            let site = &registry.sites()[registry.len() - 1];
            println!("{}  {}  {}", site.name, site.url, site.status);
        }
        Command::Export { path } => {
            let app = App::bootstrap(config).await?;
            let count = app.export_to(&path).await?;
            info!(path = %path.display(), count, "exported site list");
        }
        Command::Import { path } => {
            let app = App::bootstrap(config).await?;
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let seeds = transfer::parse_import(&raw)?;
            app.import_sites(seeds).await?;
            info!(count = app.registry.lock().await.len(), "imported site list");
        }
    }

    Ok(())
}

/// Run the sweep loop until ctrl-c, with a logging subscriber standing in
/// for the presentation layer.
async fn run(app: App) -> Result<()> {
    info!(sites = app.registry.lock().await.len(), "starting sweep loop");
    app.check_for_update().await;

    let mut events = app.bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                CoreEvent::SweepCompleted(stats) => info!(
                    online = stats.online,
                    offline = stats.offline,
                    avg_latency_ms = ?stats.avg_latency_ms,
                    "sweep completed"
                ),
                CoreEvent::RegistryChanged => debug!("registry changed"),
                CoreEvent::UpdateAvailable { version, url } => {
                    info!(version = %version, url = %url, "update available");
                }
            }
        }
    });

    let sweeps = app.sweeps();
    let handle = sweeps.clone().spawn();

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutting down");
    sweeps.stop();
    handle.abort();
    Ok(())
}

/// One-shot sweep: probe everything, print statistics and the most recent
/// records.
async fn sweep_once(app: App) {
    app.sweeps().sweep().await;

    let registry = app.registry.lock().await;
    let stats = stats::compute_statistics(registry.sites());

    println!("online: {}", stats.online);
    println!("offline: {}", stats.offline);
    match stats.avg_latency_ms {
        Some(avg) => println!("average latency: {avg} ms"),
        None => println!("average latency: -"),
    }

    for series in stats::chart_series(registry.sites(), HISTORY_LIMIT) {
        let latest = series.points.iter().rev().find_map(|point| *point);
        match latest {
            Some(latency) => println!("{}  {latency} ms", series.name),
            None => println!("{}  offline", series.name),
        }
    }
}
