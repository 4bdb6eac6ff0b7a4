//! Tracing subscriber setup

use crate::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Verbosity requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// Configured level
    #[default]
    Normal,
    /// Debug output, including every raw line
    Verbose,
}

/// Level directive for the given settings
///
/// `RUST_LOG` still takes precedence when set.
pub fn level_directive(config: &LoggingConfig, verbosity: Verbosity) -> String {
    match verbosity {
        Verbosity::Quiet => "warn".to_string(),
        Verbosity::Verbose => "debug".to_string(),
        Verbosity::Normal => config.level.clone(),
    }
}

/// Install the global subscriber
///
/// When `directory` is set, output is also written to a daily rolling file
/// there; keep the returned guard alive until exit so it gets flushed.
pub fn init_logging(
    config: &LoggingConfig,
    verbosity: Verbosity,
    directory: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_directive(config, verbosity)))?;

    let (file_writer, guard) = match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "stopwatch-relay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match (config.json, file_writer) {
        (true, Some(file)) => builder
            .json()
            .with_writer(std::io::stderr.and(file))
            .try_init(),
        (true, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (false, Some(file)) => builder
            .with_writer(std::io::stderr.and(file))
            .try_init(),
        (false, None) => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!(e))?;

    Ok(guard)
}
