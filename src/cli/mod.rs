//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Argument parsing and config overrides
//! - Exit codes for supervisors and scripts

pub mod args;
pub mod exit_codes;

pub use args::{Cli, Commands, ConfigAction, RelayArgs};
pub use exit_codes::{exit_code_description, CliResult, ExitCodes};
