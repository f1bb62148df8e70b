// ABOUTME: Entry point: CLI parsing, config load, and the single-shot update-then-launch flow
// ABOUTME: Exactly one of the service path or the delayed default path performs the update

mod config;
mod launcher;
mod playground;
mod services;

use anyhow::Result;
use clap::Parser;
use config::Config;
use launcher::EditorLauncher;
use playground::Playground;
use services::{ServiceGate, ServiceRequest};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long the default conversion waits for a service request to claim the run.
const SERVICE_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(
    name = "playnow",
    version,
    about = "Create or extend an Xcode Playground and open it in Xcode"
)]
struct Cli {
    /// Playground bundle or directory to use (defaults to the configured
    /// directory, then the Desktop)
    path: Option<PathBuf>,

    /// Treat this run as a Services invocation: the current pasteboard
    /// selection becomes the contents of the new page
    #[arg(long)]
    service: bool,
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "playnow=info".into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Errors are reported to the user; they do not change how the process
    // exits, and there are no retries.
    if let Err(e) = run(Cli::parse()) {
        error!("{e:#}");
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config();

    let (gate, sender) = ServiceGate::new();
    if cli.service {
        thread::spawn(move || match services::read_selection() {
            Ok(contents) if !contents.is_empty() => {
                let _ = sender.send(ServiceRequest { contents });
            }
            Ok(_) => warn!("service request dropped: pasteboard is empty"),
            Err(e) => warn!("service request dropped: {e:#}"),
        });
    } else {
        // No services path this run; the unreachable sender ends the wait
        // immediately instead of sitting out the grace period.
        drop(sender);
    }

    let (contents, from_services) = match gate.wait(SERVICE_GRACE) {
        Some(request) => (Some(request.contents), true),
        None => (None, false),
    };

    let playground = Playground::new(cli.path.as_deref(), contents.as_deref(), &config)?;
    let outcome = playground.update()?;
    if from_services && config.page.mark_used_if_from_services {
        playground.mark_page_as_used()?;
    }

    EditorLauncher::new(&config).open(&outcome)
}

fn load_config() -> Config {
    let path = match Config::default_config_path() {
        Ok(path) => path,
        Err(e) => {
            warn!("{e:#}; using default configuration");
            return Config::default();
        }
    };

    if !path.exists() {
        if let Err(e) = Config::save_default_config(&path) {
            warn!("{e:#}; using default configuration");
            return Config::default();
        }
        info!("created configuration at {}", path.display());
    }

    let loaded = Config::load_from_file(&path).and_then(|mut config| {
        config.validate()?;
        config.expand_paths()?;
        Ok(config)
    });
    match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!("{e:#}; using default configuration");
            Config::default()
        }
    }
}
