//! Subscriber setup for the DmxFlow binary
//!
//! Logs go to stderr and to a per-run file; stdout is left to the operator
//! console. `DMXFLOW_LOG`, when set, replaces the configured level.

use anyhow::{Context, Result};
use dmxflow_control::LogConfig;
use std::fs::File;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::{Directive, EnvFilter},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Environment variable holding filter directives, e.g. `dmxflow_control=trace`
pub const LOG_ENV: &str = "DMXFLOW_LOG";

/// Keeps the non-blocking file writer flushing until dropped
pub struct LogGuard {
    _guard: WorkerGuard,
    path: PathBuf,
}

impl LogGuard {
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// `DMXFLOW_LOG` (or the configured level) plus `config.directives`.
/// Directives that do not parse are returned so they can be reported once
/// the subscriber is up.
pub fn build_filter(config: &LogConfig) -> (EnvFilter, Vec<String>) {
    let mut filter = EnvFilter::builder()
        .with_env_var(LOG_ENV)
        .with_default_directive(config.parse_level().into())
        .from_env_lossy();

    let mut rejected = Vec::new();
    for raw in &config.directives {
        match raw.parse::<Directive>() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(_) => rejected.push(raw.clone()),
        }
    }
    (filter, rejected)
}

/// Install the global subscriber described by `config`
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    if config.file_output {
        config
            .ensure_log_directory()
            .with_context(|| format!("Failed to create log directory {:?}", config.log_dir))?;

        match config.cleanup_old_logs() {
            Ok(0) => {}
            Ok(removed) => eprintln!("Removed {} old log files", removed),
            Err(e) => eprintln!("Warning: Failed to cleanup old log files: {}", e),
        }
    }

    let (filter, rejected) = build_filter(config);

    // Thread names tell the transmit and driver loops apart
    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(true)
            .compact()
    });

    let (file_layer, guard) = if config.file_output {
        let path = config.current_log_path();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file: {:?}", path))?;
        let (writer, worker_guard) = tracing_appender::non_blocking(file);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_thread_names(true);
        (
            Some(layer),
            Some(LogGuard {
                _guard: worker_guard,
                path,
            }),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    for raw in rejected {
        tracing::warn!("Ignoring invalid log directive '{}'", raw);
    }
    tracing::info!("Logging initialized at level: {}", config.level);
    if let Some(guard) = &guard {
        tracing::info!("Log file: {:?}", guard.path());
    }
    Ok(guard)
}
