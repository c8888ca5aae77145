mod config;
mod install;
mod monitor;
mod netctl;
mod template;

use clap::Parser;
use config::GuardConfig;
use netctl::MacosSystemControl;
use std::time::Duration;
use tokio::sync::watch;

/// Keeps the machine's Wi-Fi interface powered on: installs a watchdog
/// script and a launch agent so the guard survives logout and crashes,
/// then polls the interface and re-enables it whenever it goes off.
#[derive(Parser, Debug)]
#[command(name = "wifiguard", version, about)]
pub struct Cli {
    /// Render the artifacts and print target paths, but change nothing
    #[arg(long)]
    dry_run: bool,

    /// Skip installation and go straight to the monitor loop
    #[arg(long)]
    skip_install: bool,

    /// Extra logging (per-tick outcomes, subprocess details)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    tracing::info!("wifiguard starting");
    tracing::debug!(?cli, "parsed CLI arguments");

    let config = GuardConfig::default();
    let control = MacosSystemControl::new(config.network.interface.clone());

    let app_path = match install::supervised_executable() {
        Ok(path) => path,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if cli.dry_run {
        match install::dry_run(&config, &app_path) {
            Ok(paths) => {
                println!("Dry run — nothing was installed.");
                println!("Watchdog script would be written to {}", paths.script.display());
                println!("Launch agent would be written to {}", paths.agent.display());
                println!(
                    "Agent {} would be registered via launchctl.",
                    config.persistence.label
                );
                return;
            }
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
    }

    if !cli.skip_install {
        match install::install(&config, &control, &app_path) {
            Ok(paths) => {
                println!(
                    "Self-protection installed: watchdog at {}, launch agent {} registered.",
                    paths.script.display(),
                    config.persistence.label
                );
            }
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    monitor::run(
        &control,
        Duration::from_secs(config.network.poll_interval_secs),
        shutdown_rx,
    )
    .await;
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(err) => {
            tracing::warn!(%err, "failed to install SIGTERM handler");
            let _ = ctrl_c.await;
        }
    }
}
