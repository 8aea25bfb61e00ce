use crate::error::{ConfigError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Install the global subscriber. With a log file, events go to both
/// stderr and the file (appended, no ANSI colours).
pub fn init(level: Level, log_file: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_max_level(level);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| ConfigError::Invalid(format!("Cannot install logger: {}", e)))
}
