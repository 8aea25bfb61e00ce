use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failures retrieving or decoding the provider snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Provider returned HTTP status {0}")]
    BadStatus(u16),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    #[error("Malformed content: {0}")]
    MalformedContent(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::BadStatus(status.as_u16())
        } else {
            FetchError::NetworkFailure(e.to_string())
        }
    }
}

impl From<zip::result::ZipError> for FetchError {
    fn from(e: zip::result::ZipError) -> Self {
        FetchError::MalformedArchive(e.to_string())
    }
}

/// Per-row derivation failure. Recoverable by skipping the row.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ComputationError {
    #[error("Relative humidity {0} is outside (0, 100]")]
    InvalidHumidity(f64),

    #[error("Temperature {0} is not a finite value")]
    InvalidTemperature(f64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("No valid rows in batch")]
    NoValidRows,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Database connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Schema migration failure: {0}")]
    SchemaMigrationFailure(String),

    #[error("Write failure: {0}")]
    WriteFailure(String),

    #[error("Query failure: {0}")]
    QueryFailure(String),

    #[error("Database busy: timed out waiting for lock")]
    Timeout,
}

impl StoreError {
    /// Map a write-path SQLite error, keeping lock contention distinct.
    pub(crate) fn from_write(e: rusqlite::Error) -> Self {
        if is_busy(&e) {
            StoreError::Timeout
        } else {
            StoreError::WriteFailure(e.to_string())
        }
    }

    pub(crate) fn from_query(e: rusqlite::Error) -> Self {
        if is_busy(&e) {
            StoreError::Timeout
        } else {
            StoreError::QueryFailure(e.to_string())
        }
    }

    pub(crate) fn from_migration(e: rusqlite::Error) -> Self {
        if is_busy(&e) {
            StoreError::Timeout
        } else {
            StoreError::SchemaMigrationFailure(e.to_string())
        }
    }
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// Startup-time failures: configuration and reference data.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Station reference error: {0}")]
    Stations(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}
