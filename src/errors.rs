//! Error types for credfetch
//!
//! This module defines the error types for all components of the application.
//! Per-item download failures are reported as result records; only the
//! aggregate [`IncompleteResultsError`] escapes a `download` call.

use std::path::PathBuf;
use thiserror::Error;

use crate::app::models::DownloadRecord;

/// Credential store and credential manager errors
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No credential with the requested name exists
    #[error("Credential not found: {name}")]
    NotFound { name: String },

    /// Credential record without a name
    #[error("Credential record has no 'name' field")]
    MissingName,

    /// Invalid credential name
    #[error("Invalid credential name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Unknown credential type
    #[error("Unknown credential type: {kind}. Expected 'user_password' or 'token'")]
    UnknownKind { kind: String },

    /// Credential lacks a field required by the authentication scheme
    #[error("Credential '{name}' is missing the '{field}' field required for {scheme} authentication")]
    IncompleteCredential {
        name: String,
        field: String,
        scheme: String,
    },

    /// Input was empty when prompting for a value
    #[error("{field} cannot be empty")]
    EmptyInput { field: String },

    /// I/O error while reading or writing the credential store
    #[error("Credential store I/O error")]
    Io(#[from] std::io::Error),

    /// Credential store could not be parsed
    #[error("Credential store is corrupted: {path}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Credential store could not be serialized
    #[error("Failed to serialize credential store")]
    Serialize(#[from] toml::ser::Error),

    /// Atomic replacement of the store file failed
    #[error("Failed to persist credential store to {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Download and HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Destination already exists and force flag not set
    #[error("Destination already exists: {path}. Use --force to overwrite")]
    FileExists { path: String },

    /// I/O error during file operations
    #[error("File I/O error")]
    Io(#[from] std::io::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// No destination could be derived from the URL
    #[error("Cannot derive a file name from URL: {url}")]
    NoFileName { url: String },

    /// Invalid download specification line
    #[error("Invalid download specification: {spec}")]
    InvalidSpec { spec: String },

    /// Server demanded authentication and no credential was available
    #[error("Authentication required for {url} (realm: {realm})")]
    AuthenticationRequired { url: String, realm: String },

    /// Server rejected the supplied credential
    #[error("Credential '{credential}' was rejected for {url}")]
    CredentialRejected { url: String, credential: String },

    /// Unsupported authentication scheme
    #[error("Unsupported authentication scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Resource not found
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// Access forbidden
    #[error("Access forbidden: {url}")]
    Forbidden { url: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded for download")]
    MaxRetriesExceeded { max_retries: u32 },

    /// HTTP client configuration cannot be used
    #[error("Invalid HTTP client configuration: {reason}")]
    InvalidClientConfig { reason: String },

    /// Incomplete download
    #[error("Incomplete download: received {received} bytes, expected {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },

    /// Credential lookup failed
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Config directory could not be determined
    #[error("Could not determine user config directory")]
    NoConfigDir,

    /// I/O error reading configuration
    #[error("I/O error reading configuration")]
    Io(#[from] std::io::Error),
}

/// Not every requested item completed successfully
#[derive(Error, Debug)]
#[error("{} of {} download(s) did not complete: {}", .failed.len(), .results.len(), first_message(.failed))]
pub struct IncompleteResultsError {
    /// All records produced before the error was raised
    pub results: Vec<DownloadRecord>,
    /// The subset of `results` that did not report `ok`
    pub failed: Vec<DownloadRecord>,
}

impl IncompleteResultsError {
    /// Build the error from the records of a batch, collecting the failures
    pub fn from_results(results: Vec<DownloadRecord>) -> Self {
        let failed = results.iter().filter(|r| !r.is_ok()).cloned().collect();
        Self { results, failed }
    }
}

fn first_message(failed: &[DownloadRecord]) -> String {
    failed
        .first()
        .and_then(|r| r.message.clone())
        .unwrap_or_else(|| "no message".to_string())
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Credential error
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// One or more items of a batch failed
    #[error(transparent)]
    IncompleteResults(#[from] IncompleteResultsError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Download(DownloadError::RateLimitExceeded)
                | AppError::Download(DownloadError::ServerOverloaded)
                | AppError::Download(DownloadError::Http(_))
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Credential(_) => "credential",
            AppError::Download(_) => "download",
            AppError::Config(_) => "config",
            AppError::IncompleteResults(_) => "incomplete",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Credential result type alias
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{DownloadRecord, Status};

    fn record(status: Status, message: Option<&str>) -> DownloadRecord {
        DownloadRecord {
            status,
            message: message.map(str::to_string),
            ..DownloadRecord::new("http://example.org/a", "/tmp/a")
        }
    }

    #[test]
    fn test_incomplete_results_collects_failures() {
        let err = IncompleteResultsError::from_results(vec![
            record(Status::Ok, None),
            record(Status::Error, Some("Authentication required")),
            record(Status::Impossible, Some("Destination already exists")),
        ]);

        assert_eq!(err.results.len(), 3);
        assert_eq!(err.failed.len(), 2);

        let text = err.to_string();
        assert!(text.starts_with("2 of 3 download(s)"));
        assert!(text.contains("Authentication required"));
    }

    #[test]
    fn test_error_categories() {
        let app_error = AppError::from(CredentialError::MissingName);
        assert_eq!(app_error.category(), "credential");
        assert!(!app_error.is_recoverable());

        let app_error = AppError::from(DownloadError::RateLimitExceeded);
        assert_eq!(app_error.category(), "download");
        assert!(app_error.is_recoverable());

        let app_error = AppError::from(IncompleteResultsError::from_results(Vec::new()));
        assert_eq!(app_error.category(), "incomplete");
    }
}
