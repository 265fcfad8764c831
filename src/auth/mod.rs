//! Credential management
//!
//! This module provides named credential records, a file-backed keyring and
//! the [`CredentialManager`] used by downloads to answer authentication
//! challenges.
//!
//! # Examples
//!
//! ```rust,no_run
//! use credfetch::auth::{Credential, CredentialManager};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credman = CredentialManager::from_default_location()?;
//! credman.set(Credential::user_password("study-server", "mike", "s3cr3t"))?;
//! assert!(credman.get("study-server")?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod manager;
pub mod store;

// Re-export main public API
pub use credentials::{prompt_secret, prompt_user, validate_name, Credential, CredentialKind};
pub use manager::CredentialManager;
pub use store::CredentialStore;
