use std::fmt;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Custom error type for logger initialization
#[derive(Debug)]
pub enum InitializeLoggerError {
    InvalidLevel(String),
    SetGlobalDefaultError(String),
}

impl fmt::Display for InitializeLoggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializeLoggerError::InvalidLevel(level) => {
                write!(f, "Unrecognized log level: {}", level)
            }
            InitializeLoggerError::SetGlobalDefaultError(e) => write!(
                f,
                "Logger already initialized or failed to set global default subscriber: {}",
                e
            ),
        }
    }
}

impl std::error::Error for InitializeLoggerError {}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With `verbose` set the bridge
/// target is raised to TRACE so per-message decoding is visible.
pub fn initialize_logger(level: &str, verbose: bool) -> Result<(), InitializeLoggerError> {
    let rust_level = parse_level(level, verbose)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!("{},mei_bridge=trace", rust_level))
        } else {
            EnvFilter::new(format!("{}", rust_level))
        }
    });

    // Get the filter's string representation for logging *before* it's consumed
    let filter_str = filter.to_string();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_level(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| InitializeLoggerError::SetGlobalDefaultError(e.to_string()))?;

    tracing::info!(
        target: "mei_bridge",
        "Logger initialized with level {:?} (effective filter: {})",
        rust_level,
        filter_str
    );

    Ok(())
}

#[inline]
fn parse_level(level: &str, verbose: bool) -> Result<Level, InitializeLoggerError> {
    if verbose {
        return Ok(Level::TRACE);
    }
    match level.trim().to_ascii_lowercase().as_str() {
        "error" | "critical" => Ok(Level::ERROR),
        "warn" | "warning" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        other => Err(InitializeLoggerError::InvalidLevel(other.to_string())),
    }
}
