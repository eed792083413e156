//! tracing subscriber setup

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::LoggingError;

/// How and where to log
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    pub debug: bool,
    pub json: bool,
    /// Append logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl LogOptions {
    /// Filter used when RUST_LOG is not set
    pub fn default_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "error"
        }
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must live as long as logging is needed.
pub fn init(options: &LogOptions) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_directive()));

    let (writer, guard) = match &options.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let (json_layer, text_layer) = if options.json {
        (Some(fmt::layer().json().with_writer(writer)), None)
    } else {
        let ansi = options.file.is_none();
        (None, Some(fmt::layer().with_ansi(ansi).with_writer(writer)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    Ok(guard)
}
