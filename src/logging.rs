// Process-wide logging: console plus a timestamped file per run.
//
// Installed once by the binary; library code only emits `tracing` events.
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

pub const DEFAULT_FILTER: &str = "efl_unify=info";

/// Install the global subscriber and return the path of the log file.
pub fn init_logging(log_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(format!(
        "efl_unify_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = File::create(&log_path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialised: {}", e)))?;

    Ok(log_path)
}
