//! Binary entrypoint for the blur wallpaper.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use rust_blur_wallpaper::config::Configuration;
use rust_blur_wallpaper::events::FeederCommand;
use rust_blur_wallpaper::tasks::{feeder, files, viewer};

#[derive(Debug, Parser)]
#[command(name = "blur-wallpaper", version, about = "Blurred artwork wallpaper")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the time each artwork stays on screen (ms)
    #[arg(long, value_name = "MILLIS")]
    dwell_ms: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("rust_blur_wallpaper={level}").parse()?)
        .add_directive("blur_wallpaper=info".parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(ms) = cli.dwell_ms {
        cfg.dwell = Duration::from_millis(ms);
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    info!("Loaded configuration from {}:\n{:#?}", cli.config.display(), cfg);

    let rotation = files::load_rotation(&cfg).context("failed to scan artwork library")?;
    info!(
        artworks = rotation.len(),
        dwell = %humantime::format_duration(cfg.dwell),
        "starting slideshow"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let event_loop = viewer::event_loop()?;
    let (feeder_tx, feeder_rx) = mpsc::channel::<FeederCommand>(16);
    let feeder_task = tokio::spawn({
        let notifier = viewer::ProxyNotifier::new(event_loop.create_proxy());
        let dwell = cfg.dwell;
        let cancel = cancel.clone();
        async move {
            feeder::run(rotation, dwell, feeder_rx, notifier, cancel)
                .await
                .context("feeder task failed")
        }
    });

    let result = viewer::run_windowed(event_loop, cfg, cancel.clone(), feeder_tx);
    cancel.cancel();
    match feeder_task.await {
        Ok(Err(err)) => warn!("{err:#}"),
        Err(err) => warn!("feeder task panicked: {err}"),
        Ok(Ok(())) => {}
    }
    result
}
