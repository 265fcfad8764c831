//! File-backed credential keyring
//!
//! Credentials are kept in a single TOML file readable only by its owner.
//! Every write replaces the file atomically through a temporary file in the
//! same directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::auth::credentials::Credential;
use crate::constants::{credentials, env as env_constants, files};
use crate::errors::{CredentialError, CredentialResult};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default, rename = "credential")]
    credentials: Vec<Credential>,
}

/// Credential keyring stored in a TOML file
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Open a store at an explicit path; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the default store location
    ///
    /// `CREDFETCH_CREDENTIAL_STORE` wins over the user config directory.
    pub fn default_path() -> CredentialResult<PathBuf> {
        if let Ok(path) = std::env::var(env_constants::CREDENTIAL_STORE) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let config_dir = dirs::config_dir().ok_or_else(|| {
            CredentialError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine user config directory",
            ))
        })?;
        Ok(config_dir
            .join(files::APP_DIR_NAME)
            .join(credentials::STORE_FILE_NAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all credentials; a missing file is an empty store
    pub fn load(&self) -> CredentialResult<Vec<Credential>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let file: StoreFile =
            toml::from_str(&content).map_err(|source| CredentialError::Corrupted {
                path: self.path.clone(),
                source,
            })?;
        Ok(file.credentials)
    }

    /// Replace the store content
    pub fn save(&self, credentials: Vec<Credential>) -> CredentialResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let content = toml::to_string_pretty(&StoreFile { credentials })?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;

        // Restrict before the file becomes visible under its final name
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(credentials::STORE_FILE_PERMISSIONS);
            temp.as_file().set_permissions(perms)?;
        }

        temp.persist(&self.path)
            .map_err(|e| CredentialError::Persist {
                path: self.path.clone(),
                source: e.error,
            })?;

        tracing::debug!("Credential store written: {}", self.path.display());
        Ok(())
    }
}
