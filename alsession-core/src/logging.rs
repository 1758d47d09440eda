//! Logging setup
//!
//! Structured `tracing` output with env-filter support, plus a timing helper
//! used around resolution epochs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Whether to include file and line information
    pub include_location: bool,
    /// Whether to include thread information
    pub include_thread: bool,
    /// Append to this file instead of writing to stdout
    pub log_file_path: Option<PathBuf>,
    /// Emit span close events with timings
    pub enable_performance_monitoring: bool,
    /// Custom filter directives
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            log_file_path: None,
            enable_performance_monitoring: false,
            filter_directives: vec![
                "alsession=debug".to_string(),
                "alsession_core=info".to_string(),
                "alsession_fox=info".to_string(),
            ],
        }
    }
}

/// Initialize the global subscriber. Fails if one is already installed.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    for directive in &config.filter_directives {
        filter = filter.add_directive(directive.parse()?);
    }

    let writer = match &config.log_file_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let span_events = if config.enable_performance_monitoring {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread);

    let layer = match config.format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    Ok(())
}

/// Performance monitoring utilities
pub mod performance {
    use std::time::Instant;
    use tracing::{info_span, Instrument};

    /// Run `future` inside a span and log how long it took
    pub async fn measure_async<F, T>(operation_name: &str, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let span = info_span!("performance", operation = operation_name);
        let start = Instant::now();

        let result = future.instrument(span).await;

        tracing::debug!(
            target: "performance",
            operation = operation_name,
            duration_ms = start.elapsed().as_millis() as u64,
            "Operation completed"
        );

        result
    }
}
