//! credfetch Library
//!
//! Downloads files over HTTP from servers that require authentication.
//! Credentials are kept as named records in a local credential store and are
//! offered only after the server answers with an authentication challenge.
//! Every requested item yields a result record; failed items make the
//! `download` call return [`IncompleteResultsError`].
//!
//! ```rust,no_run
//! use credfetch::prelude::*;
//!
//! # async fn example() -> credfetch::Result<()> {
//! let credman = CredentialManager::from_default_location()?;
//! let records = download(
//!     "https://data.example.org/study_1/visit_1_dicom.tar",
//!     &credman,
//!     &DownloadOptions::default().with_credential("dataaccess"),
//! )
//! .await?;
//! assert!(records.iter().all(|r| r.status == Status::Ok));
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use app::download;
pub use errors::{AppError, IncompleteResultsError, Result};
