//! Logging configuration
//!
//! The subscriber itself is installed by the binary; this module only
//! describes where logs go and manages the log directory.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::Level;

fn default_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_prefix() -> String {
    "dmxflow".to_string()
}

fn default_max_files() -> usize {
    10
}

fn default_true() -> bool {
    true
}

/// Per-frame transmit logging stays off unless asked for explicitly
fn default_directives() -> Vec<String> {
    vec!["dmxflow_control::dmx::transmitter=debug".to_string()]
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Log files kept by [`LogConfig::cleanup_old_logs`]
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_true")]
    pub console_output: bool,
    #[serde(default = "default_true")]
    pub file_output: bool,
    /// Extra `target=level` filter directives, applied after `level`
    #[serde(default = "default_directives")]
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: default_log_dir(),
            file_prefix: default_file_prefix(),
            max_files: default_max_files(),
            console_output: true,
            file_output: true,
            directives: default_directives(),
        }
    }
}

impl LogConfig {
    /// Configured level, INFO if it does not parse
    pub fn parse_level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }

    pub fn ensure_log_directory(&self) -> io::Result<()> {
        fs::create_dir_all(&self.log_dir)
    }

    /// Path of the log file for this run: `<prefix>_<YYYYmmdd_HHMMSS>.log`.
    /// The timestamp is taken once per process.
    pub fn current_log_path(&self) -> PathBuf {
        static STAMP: OnceLock<String> = OnceLock::new();
        let stamp = STAMP.get_or_init(|| Local::now().format("%Y%m%d_%H%M%S").to_string());
        self.log_dir
            .join(format!("{}_{}.log", self.file_prefix, stamp))
    }

    /// Delete the oldest log files so that at most `max_files - 1` remain,
    /// leaving room for the file this run creates
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_dir.exists() {
            return Ok(0);
        }

        let prefix = format!("{}_", self.file_prefix);
        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().and_then(|e| e.to_str()) == Some("log")
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect();

        let keep = self.max_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(0);
        }

        // Timestamped names sort oldest first
        logs.sort();
        let excess = logs.len() - keep;
        for path in &logs[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }
}
