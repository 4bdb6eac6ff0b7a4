//! Stopwatch Relay - forwards stopwatch timings from a serial device to an
//! HTTP collector, unattended.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use stopwatch_relay::cli::{Cli, CliResult, Commands, ConfigAction};
use stopwatch_relay::config::RelayConfig;
use stopwatch_relay::core::relay::RelayLoop;
use stopwatch_relay::core::transport::list_ports;
use stopwatch_relay::utils::{init_logging, Shutdown, Verbosity};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        None => run_relay(&cli),
        Some(Commands::ListPorts { detailed }) => show_ports(*detailed),
        Some(Commands::Config { action }) => handle_config(&cli, action),
    }
    .unwrap_or_else(CliResult::from);

    match (&result, result.message()) {
        (CliResult::Error(..), Some(msg)) => eprintln!("Error: {msg}"),
        (CliResult::Success(_), Some(msg)) => println!("{msg}"),
        _ => {}
    }
    result.to_exit_code()
}

fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(RelayConfig::default_path()?),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let mut config = match &cli.config {
        Some(path) => RelayConfig::load_from(path)?,
        None => RelayConfig::load()?,
    };
    cli.relay.apply(&mut config);
    Ok(config)
}

fn run_relay(cli: &Cli) -> anyhow::Result<CliResult> {
    let config = load_config(cli)?;
    config.validate()?;

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let _guard = init_logging(&config.logging, verbosity, config.logging.directory.as_deref())?;

    tracing::info!("Starting {} v{}", stopwatch_relay::NAME, stopwatch_relay::VERSION);
    tracing::info!(
        port = %config.serial.port,
        baud = config.serial.baud_rate,
        collector = %config.collector.url,
        "Relay configured"
    );

    let shutdown = Shutdown::new();
    shutdown.install_handler()?;

    let outcome = RelayLoop::from_config(&config).run(&shutdown);
    tracing::info!("Exiting");

    match outcome {
        Ok(_) => Ok(CliResult::success()),
        Err(e) => Ok(e.into()),
    }
}

fn show_ports(detailed: bool) -> anyhow::Result<CliResult> {
    let ports = list_ports()?;

    if ports.is_empty() {
        return Ok(CliResult::success_with_message("No serial ports found."));
    }

    for port in &ports {
        if detailed {
            println!("  {} [{:?}]", port.port_name, port.port_type);
        } else {
            println!("{}", port.port_name);
        }
    }
    Ok(CliResult::success())
}

fn handle_config(cli: &Cli, action: &ConfigAction) -> anyhow::Result<CliResult> {
    match action {
        ConfigAction::Show => {
            let config = load_config(cli)?;
            print!("{}", config.to_toml()?);
            Ok(CliResult::success())
        }
        ConfigAction::Init { force } => {
            let path = config_path(cli)?;
            if path.exists() && !force {
                return Ok(CliResult::error(
                    stopwatch_relay::ExitCodes::CONFIG_ERROR,
                    format!("{} already exists (use --force to overwrite)", path.display()),
                ));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            RelayConfig::default().save_to(&path)?;
            Ok(CliResult::success_with_message(format!(
                "Wrote {}",
                path.display()
            )))
        }
    }
}
