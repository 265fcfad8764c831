//! Prelude module for credfetch
//!
//! Re-exports the items needed for typical library usage with a single
//! `use credfetch::prelude::*;` statement.

// Core result types
pub use crate::errors::{AppError, IncompleteResultsError, Result};

// Downloading
pub use crate::app::{
    check_results, download, ClientConfig, DownloadOptions, DownloadRecord, DownloadSource,
    Downloader, FetchClient, OnFailure, ResultRenderer, Status,
};

// Credentials
pub use crate::auth::{Credential, CredentialKind, CredentialManager, CredentialStore};

// Configuration
pub use crate::config::AppConfig;

pub use std::path::{Path, PathBuf};
