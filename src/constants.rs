//! Application constants for credfetch
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Overrides the location of the credential store file
    pub const CREDENTIAL_STORE: &str = "CREDFETCH_CREDENTIAL_STORE";

    /// Prefix for per-credential field overrides, e.g.
    /// `CREDFETCH_CREDENTIAL_MYSERVER_SECRET`
    pub const CREDENTIAL_PREFIX: &str = "CREDFETCH_CREDENTIAL_";
}

/// Credential-related constants
pub mod credentials {
    /// Maximum allowed credential name length
    pub const MAX_NAME_LENGTH: usize = 100;

    /// File permissions for the credential store (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const STORE_FILE_PERMISSIONS: u32 = 0o600;

    /// Store file name inside the application config directory
    pub const STORE_FILE_NAME: &str = "credentials.toml";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("credfetch/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Rate limiting and retry configuration
pub mod limits {
    use super::Duration;

    /// Default rate limit (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 15;

    /// Maximum retry attempts for transient failures
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    /// Upper bound for a single backoff delay
    pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "credfetch.toml";

    /// Application directory name under the user config directory
    pub const APP_DIR_NAME: &str = "credfetch";
}

/// Result record constants
pub mod results {
    /// Action name reported by every download record
    pub const DOWNLOAD_ACTION: &str = "download";
}

pub use env::{CREDENTIAL_PREFIX as ENV_CREDENTIAL_PREFIX, CREDENTIAL_STORE as ENV_CREDENTIAL_STORE};
pub use files::TEMP_FILE_SUFFIX;
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_RETRIES, RETRY_BASE_DELAY_MS};
