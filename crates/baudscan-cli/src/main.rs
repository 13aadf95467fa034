use anyhow::{Context, Result};
use baudscan_core::prelude::*;
use baudscan_core::sim::{SimulatedResetLine, SimulatedTarget};
use baudscan_core::transport::list_ports;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod console;
mod session;

use cli::{Cli, Commands, DetectArgs};
use console::ConsoleReporter;
use session::SessionHandler;

const CONFIG_FILE_NAME: &str = "config.json";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::ListPorts => print_ports(),
        Commands::Detect(args) => {
            let config = load_config(cli.config.as_deref(), &args)?;
            detect(config, args.no_prompt).await
        }
        Commands::Demo { speed, args } => {
            let config = load_config(cli.config.as_deref(), &args)?;
            demo(config, speed).await
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("baudscan").join(CONFIG_FILE_NAME))
}

/// Explicit file, else the per-user file if it exists, else defaults; flags win
fn load_config(path: Option<&Path>, args: &DetectArgs) -> Result<DetectionConfig> {
    let mut config = match path {
        Some(path) => DetectionConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                info!(path = %path.display(), "using config file");
                DetectionConfig::from_file(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?
            }
            None => DetectionConfig::default(),
        },
    };
    args.apply(&mut config);
    config.validate().context("invalid options")?;
    Ok(config)
}

fn print_ports() -> Result<()> {
    let ports = list_ports().context("failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        match &port.description {
            Some(description) => println!("{}  {}", port.name, description),
            None => println!("{}", port.name),
        }
    }
    Ok(())
}

/// First Ctrl+C cancels the scan; a second one exits immediately
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, stopping...");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

async fn detect(config: DetectionConfig, no_prompt: bool) -> Result<()> {
    let port_name = config
        .port
        .clone()
        .context("no serial port given (use --port or set \"port\" in the config file)")?;

    let transport = SerialTransport::open(&port_name, None)
        .with_context(|| format!("failed to open {}", port_name))?;

    let reset_config = config.reset_config()?;
    let reset = match reset_config.pin {
        Some(pin) => {
            let line = transport
                .control_line(pin)
                .with_context(|| format!("failed to use {} as reset line", pin))?;
            ResetStrategy::new(Box::new(line), &reset_config)
        }
        None => ResetStrategy::disabled(),
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let engine = DetectionEngine::from_config(transport, &config)?
        .with_reset(reset)
        .with_reporter(Box::new(ConsoleReporter::new()))
        .with_cancellation(cancel.clone())
        .with_accept_handler(Box::new(SessionHandler::new(cancel, !no_prompt)));

    info!("Press Ctrl+C to cancel");
    run_engine(engine, config.candidates()?).await
}

async fn demo(config: DetectionConfig, speed: Speed) -> Result<()> {
    let reset_config = config.reset_config()?;
    let mut target = SimulatedTarget::demo(speed);
    let mut reset = ResetStrategy::disabled();
    if reset_config.pin.is_some() {
        let line = SimulatedResetLine::new();
        target = target.boot_on_reset(&line);
        reset = ResetStrategy::new(Box::new(line), &reset_config);
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let engine = DetectionEngine::from_config(target, &config)?
        .with_reset(reset)
        .with_reporter(Box::new(ConsoleReporter::new()))
        .with_cancellation(cancel);

    run_engine(engine, config.candidates()?).await
}

async fn run_engine<T>(mut engine: DetectionEngine<T>, candidates: CandidateSource) -> Result<()>
where
    T: Transport + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || engine.run(candidates))
        .await
        .context("detection task panicked")??;

    match result {
        DetectionResult::Found(speed) => info!(speed, "detection finished"),
        DetectionResult::Exhausted => {
            println!("[-] No valid baudrate found");
            std::process::exit(1);
        }
    }
    Ok(())
}
