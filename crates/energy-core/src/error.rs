use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while reconstructing blocks and attributing scan energy.
#[derive(Error, Debug)]
pub enum EnergyError {
    /// A log file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A timestamp did not match `YYYY/MM/DD-HH:MM:SS.ffffff`.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A `cmdUpdateEngInfo` line carried no usable energy value.
    #[error("Invalid energy value in line: {0}")]
    EnergyParse(String),

    /// Log segments were not supplied in file-name order.
    #[error("Log files out of order: {previous} sorts after {next}")]
    FileOrder { previous: String, next: String },

    /// The expected log directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No log files with the configured extension were found.
    #[error("No log files found in {0}")]
    NoLogFiles(PathBuf),

    /// The catalogue has no identifier for the requested date.
    #[error("No date entry for {date} in schema {schema}")]
    UnknownDate { schema: String, date: String },

    /// The scan catalogue is missing a table or holds a malformed row.
    #[error("Catalogue error: {0}")]
    Catalogue(String),

    /// A CSV document could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed or serialised.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the energy crates.
pub type Result<T> = std::result::Result<T, EnergyError>;
