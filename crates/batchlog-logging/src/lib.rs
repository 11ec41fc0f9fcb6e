//! Logging setup for batchlog binaries
//!
//! Library crates only emit `tracing` events; binaries install a subscriber
//! with [`SubscriberBuilder`]:
//!
//! ```ignore
//! use batchlog_logging::{LogConfig, SubscriberBuilder};
//!
//! // Human-readable console output at debug level
//! let _guard = SubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```
//!
//! `RUST_LOG` overrides the configured default level.

pub mod config;

pub use config::{ConsoleConfig, FileConfig, JsonConfig, LogConfig, RotationStrategy};

use std::fs::{self, File};
use std::io;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors from installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Builder for configuring and initializing the global subscriber
#[derive(Debug, Default)]
pub struct SubscriberBuilder {
    config: LogConfig,
}

impl SubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration that will be installed
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes file output when dropped and must be kept
    /// alive for the life of the program.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(self.console_layer());
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(self.json_layer(writer));
            guard = Some(file_guard);
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;

        tracing::info!(
            level = %self.config.default_level,
            console = self.config.console.enabled,
            file = ?self.config.file.as_ref().map(|f| &f.directory),
            "Logging initialized"
        );
        Ok(guard)
    }

    /// Install the subscriber globally, reporting failures on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: {}", e);
                None
            }
        }
    }

    fn console_layer(&self) -> BoxedLayer {
        if self.config.console.pretty {
            tracing_subscriber::fmt::layer()
                .with_ansi(self.config.console.ansi)
                .with_target(true)
                .with_writer(io::stderr)
                .boxed()
        } else {
            let json = &self.config.json;
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(json.include_spans)
                .flatten_event(json.flatten_events)
                .with_file(json.include_location)
                .with_line_number(json.include_location)
                .with_writer(io::stderr)
                .boxed()
        }
    }

    fn json_layer(&self, writer: NonBlocking) -> BoxedLayer {
        let json = &self.config.json;
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(json.include_spans)
            .flatten_event(json.flatten_events)
            .with_file(json.include_location)
            .with_line_number(json.include_location)
            .with_writer(writer)
            .boxed()
    }
}

/// Create the file writer; `Never` truncates a single file, the others append
/// to rolling files
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;
    let pair = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            tracing_appender::non_blocking(File::create(path)?)
        }
        RotationStrategy::Daily => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::DAILY,
            &config.directory,
            &config.prefix,
        )),
        RotationStrategy::Hourly => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::HOURLY,
            &config.directory,
            &config.prefix,
        )),
    };
    Ok(pair)
}
