//! # Stopwatch Relay Library
//!
//! Bridges a stopwatch on a serial link to a remote HTTP collector:
//! - Serial connection with unbounded (or configurable) reconnect
//! - `TIME:<ms>` line parsing with permissive decoding
//! - Best-effort, at-most-once JSON delivery per event
//! - Graceful shutdown on SIGINT / SIGTERM
//!
//! ## Example
//!
//! ```rust,no_run
//! use stopwatch_relay::{RelayConfig, RelayLoop, Shutdown};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = RelayConfig::default();
//!     config.serial.port = "/dev/ttyACM0".into();
//!     config.collector.url = "https://example.com/collect".into();
//!     config.validate()?;
//!
//!     let shutdown = Shutdown::new();
//!     shutdown.install_handler()?;
//!
//!     let stats = RelayLoop::from_config(&config).run(&shutdown)?;
//!     println!("Delivered {} events", stats.events_delivered);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;
pub mod utils;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{ConfigError, RelayConfig};
pub use crate::core::connection::{
    ConnectError, ConnectionState, ReadOutcome, RetryPolicy, SerialConnection,
};
pub use crate::core::delivery::{CollectorReply, DeliveryError, EventSink, HttpCollector};
pub use crate::core::event::Event;
pub use crate::core::parser::{decode_line, parse_line, ParseRejected};
pub use crate::core::relay::{RelayLoop, RelayStats, StepOutcome};
pub use crate::core::transport::{
    LinePort, PortOpener, SerialConfig, SerialPortOpener, TransportError,
};
pub use crate::utils::shutdown::Shutdown;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
