//! Command-line arguments

use crate::config::RelayConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Stopwatch relay CLI
#[derive(Parser, Debug)]
#[command(
    name = "stopwatch-relay",
    version,
    about = "Relay stopwatch timings from a serial device to an HTTP collector",
    long_about = None
)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "STOPWATCH_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output (logs every raw line)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(flatten)]
    pub relay: RelayArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Overrides for the relay settings
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayArgs {
    /// Serial port name (e.g., COM3, /dev/ttyACM0)
    #[arg(short, long, env = "STOPWATCH_PORT")]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Collector endpoint URL
    #[arg(short, long, env = "STOPWATCH_COLLECTOR_URL")]
    pub url: Option<String>,

    /// Seconds between reconnect attempts
    #[arg(long)]
    pub retry_delay: Option<u64>,

    /// Collector request timeout (seconds)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Give up after this many connect attempts (0 = never)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Also write daily log files (to the configured or default log directory)
    #[arg(long)]
    pub log_files: bool,
}

impl RelayArgs {
    /// Overlay command-line values on loaded settings
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(port) = &self.port {
            config.serial.port.clone_from(port);
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(url) = &self.url {
            config.collector.url.clone_from(url);
        }
        if let Some(delay) = self.retry_delay {
            config.relay.retry_delay_secs = delay;
        }
        if let Some(timeout) = self.timeout {
            config.collector.timeout_secs = timeout;
        }
        if let Some(max) = self.max_attempts {
            config.relay.max_connect_attempts = max;
        }
        if self.json_logs {
            config.logging.json = true;
        }
        if self.log_files && config.logging.directory.is_none() {
            config.logging.directory = crate::config::log_dir();
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available serial ports
    ListPorts {
        /// Show detailed info
        #[arg(short, long)]
        detailed: bool,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config file actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
