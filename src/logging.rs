//! Tracing subscriber setup.
//!
//! Events go to stderr and, when `logs-home` is writable, to a plain-text
//! file `tomolog_<timestamp>.log` inside it. `RUST_LOG` overrides the level
//! chosen from `--verbose`.

use crate::config::GeneralConfig;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Log file name for a run started now.
pub fn log_file_name() -> String {
    format!(
        "tomolog_{}.log",
        chrono::Local::now().format("%Y-%m-%d_%H_%M_%S")
    )
}

fn open_log_file(logs_home: &Path) -> std::io::Result<(File, PathBuf)> {
    fs::create_dir_all(logs_home)?;
    let path = logs_home.join(log_file_name());
    Ok((File::create(&path)?, path))
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,tomolog=debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Install the global subscriber. Returns the log file path, if any.
pub fn init(general: &GeneralConfig) -> Option<PathBuf> {
    let (file_layer, log_path) = match open_log_file(&general.logs_home) {
        Ok((file, path)) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Some(path),
        ),
        Err(e) => {
            eprintln!(
                "warning: cannot write logs to {}: {e}",
                general.logs_home.display()
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(default_filter(general.verbose))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    log_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_name_is_timestamped() {
        let name = log_file_name();
        assert!(name.starts_with("tomolog_"));
        assert!(name.ends_with(".log"));
        // tomolog_YYYY-MM-DD_HH_MM_SS.log
        assert_eq!(name.len(), "tomolog_2024-01-01_00_00_00.log".len());
    }

    #[test]
    fn open_log_file_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let logs = tmp.path().join("logs");
        let (_, path) = open_log_file(&logs).unwrap();
        assert!(path.exists());
        assert_eq!(path.parent(), Some(logs.as_path()));
    }
}
