//! Credential manager
//!
//! High-level access to named credentials: registration, lookup with
//! environment overrides, realm queries and usage bookkeeping on top of a
//! [`CredentialStore`].

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::auth::credentials::{env_prefix, validate_name, Credential, CredentialKind};
use crate::auth::store::CredentialStore;
use crate::errors::{CredentialError, CredentialResult};

/// Named credential registry
#[derive(Debug, Clone)]
pub struct CredentialManager {
    store: CredentialStore,
    use_env: bool,
}

impl CredentialManager {
    /// Create a manager on top of an existing store
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            use_env: true,
        }
    }

    /// Create a manager for the store file at `path`
    pub fn with_store_path(path: impl Into<PathBuf>) -> Self {
        Self::new(CredentialStore::new(path))
    }

    /// Create a manager for the default store location
    pub fn from_default_location() -> CredentialResult<Self> {
        Ok(Self::new(CredentialStore::new(CredentialStore::default_path()?)))
    }

    /// Disable `CREDFETCH_CREDENTIAL_*` overrides
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Underlying store
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Register a credential, merging into an existing record of the same name
    pub fn set(&self, credential: Credential) -> CredentialResult<()> {
        validate_name(&credential.name)?;

        let mut credentials = self.store.load()?;
        match credentials.iter_mut().find(|c| c.name == credential.name) {
            Some(existing) => {
                debug!("Updating credential '{}'", credential.name);
                existing.merge(credential);
            }
            None => {
                debug!("Adding credential '{}'", credential.name);
                credentials.push(credential);
            }
        }
        self.store.save(credentials)
    }

    /// Register a credential from a field map that contains at least `name`
    ///
    /// Without a `type` field an existing record keeps its kind.
    pub fn set_fields(&self, fields: &HashMap<String, String>) -> CredentialResult<()> {
        let mut credential = Credential::from_fields(fields)?;
        if !fields.contains_key("type") {
            if let Some(existing) = self
                .store
                .load()?
                .into_iter()
                .find(|c| c.name == credential.name)
            {
                credential.kind = existing.kind;
            }
        }
        self.set(credential)
    }

    /// Look up a credential by name, with environment overrides applied
    pub fn get(&self, name: &str) -> CredentialResult<Option<Credential>> {
        if self.use_env {
            self.get_with_vars(name, std::env::vars())
        } else {
            self.get_with_vars(name, std::iter::empty())
        }
    }

    fn get_with_vars<I>(&self, name: &str, vars: I) -> CredentialResult<Option<Credential>>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let credentials = self.store.load()?;
        let prefix = env_prefix(name);
        let ambiguous = credentials
            .iter()
            .any(|c| c.name != name && env_prefix(&c.name) == prefix);
        let stored = credentials.into_iter().find(|c| c.name == name);

        if ambiguous {
            warn!(
                "Ignoring {}* variables: the prefix is shared by several credentials",
                prefix
            );
            return Ok(stored);
        }

        let (mut credential, stored_found) = match stored {
            Some(credential) => (credential, true),
            None => (Credential::new(name, CredentialKind::default()), false),
        };
        let env_found = credential.apply_env_overrides(vars)?;

        if stored_found || env_found {
            Ok(Some(credential))
        } else {
            Ok(None)
        }
    }

    /// Look up a credential by name, failing when it does not exist
    pub fn require(&self, name: &str) -> CredentialResult<Credential> {
        self.get(name)?.ok_or_else(|| CredentialError::NotFound {
            name: name.to_string(),
        })
    }

    /// Remove a credential; returns whether it existed
    pub fn remove(&self, name: &str) -> CredentialResult<bool> {
        let mut credentials = self.store.load()?;
        let before = credentials.len();
        credentials.retain(|c| c.name != name);

        if credentials.len() == before {
            return Ok(false);
        }
        self.store.save(credentials)?;
        info!("Removed credential '{}'", name);
        Ok(true)
    }

    /// All stored credentials, sorted by name
    pub fn list(&self) -> CredentialResult<Vec<Credential>> {
        let mut credentials = self.store.load()?;
        credentials.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(credentials)
    }

    /// Most recently used complete credential registered for `realm`
    pub fn query_by_realm(&self, realm: &str) -> CredentialResult<Option<Credential>> {
        let mut matches: Vec<Credential> = self
            .store
            .load()?
            .into_iter()
            .filter(|c| c.realm.as_deref() == Some(realm))
            .collect();
        matches.sort_by(|a, b| b.last_used.cmp(&a.last_used));

        for candidate in matches {
            // Re-read through `get` so environment overrides apply
            if let Some(credential) = self.get(&candidate.name)? {
                if credential.is_complete() {
                    return Ok(Some(credential));
                }
            }
        }
        Ok(None)
    }

    /// Record a successful use of `name` for `realm`
    ///
    /// The realm is only stored if the credential had none. Credentials that
    /// exist solely in the environment are not persisted.
    pub fn mark_used(&self, name: &str, realm: &str) -> CredentialResult<()> {
        let mut credentials = self.store.load()?;
        let Some(credential) = credentials.iter_mut().find(|c| c.name == name) else {
            return Ok(());
        };

        if credential.realm.is_none() {
            credential.realm = Some(realm.to_string());
        }
        credential.last_used = Some(Utc::now());
        self.store.save(credentials)
    }
}
