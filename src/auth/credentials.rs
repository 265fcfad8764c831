//! Credential records and field handling
//!
//! A credential is a named set of authentication fields. Records are built
//! from string field maps, can be overridden from environment variables and
//! never reveal their secret through `Debug` or error messages.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{credentials, env as env_constants};
use crate::errors::{CredentialError, CredentialResult};

/// Kind of secret a credential carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Username plus password, used for HTTP Basic authentication
    #[default]
    UserPassword,
    /// Bare token, used for HTTP Bearer authentication
    Token,
}

impl CredentialKind {
    /// Name as used in field maps and the store file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserPassword => "user_password",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user_password" | "user-password" => Ok(Self::UserPassword),
            "token" => Ok(Self::Token),
            other => Err(CredentialError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// A named credential record
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Unique name the credential is referenced by
    pub name: String,
    /// Credential type
    #[serde(rename = "type", default)]
    pub kind: CredentialKind,
    /// Login name (user_password credentials)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Password or token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Authentication realm this credential was used for, `<origin>/<realm>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    /// Last successful use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    /// Additional free-form fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("user", &self.user)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("realm", &self.realm)
            .field("last_used", &self.last_used)
            .field("properties", &self.properties)
            .finish()
    }
}

impl Credential {
    /// Create an empty credential of the given kind
    pub fn new(name: impl Into<String>, kind: CredentialKind) -> Self {
        Self {
            name: name.into(),
            kind,
            user: None,
            secret: None,
            realm: None,
            last_used: None,
            properties: BTreeMap::new(),
        }
    }

    /// Convenience constructor for a username/password credential
    pub fn user_password(
        name: impl Into<String>,
        user: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            user: Some(user.into()),
            secret: Some(secret.into()),
            ..Self::new(name, CredentialKind::UserPassword)
        }
    }

    /// Convenience constructor for a token credential
    pub fn token(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Self::new(name, CredentialKind::Token)
        }
    }

    /// Build a credential from a field map; `name` is required
    ///
    /// Recognised keys are `name`, `type`, `user`, `secret` and `realm`.
    /// Any other key is kept as a property.
    pub fn from_fields(fields: &HashMap<String, String>) -> CredentialResult<Self> {
        let name = fields
            .get("name")
            .filter(|n| !n.is_empty())
            .ok_or(CredentialError::MissingName)?;
        validate_name(name)?;

        let kind = match fields.get("type") {
            Some(kind) => kind.parse()?,
            None => CredentialKind::default(),
        };

        let mut credential = Self::new(name.clone(), kind);
        for (key, value) in fields {
            credential.apply_field(key, value)?;
        }
        Ok(credential)
    }

    /// Overwrite the fields present in `other`, keeping everything else
    pub fn merge(&mut self, other: Credential) {
        self.kind = other.kind;
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.secret.is_some() {
            self.secret = other.secret;
        }
        if other.realm.is_some() {
            self.realm = other.realm;
        }
        if other.last_used.is_some() {
            self.last_used = other.last_used;
        }
        self.properties.extend(other.properties);
    }

    /// Apply `CREDFETCH_CREDENTIAL_<NAME>_<FIELD>` variables from `vars`
    ///
    /// Only the fields in [`ENV_FIELDS`] are recognised, so a variable meant
    /// for a longer name (`<NAME>_SERVER_SECRET`) never matches. Returns true
    /// if at least one variable matched.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> CredentialResult<bool>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = env_prefix(&self.name);
        let mut matched = false;
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(&prefix) else {
                continue;
            };
            let field = field.to_ascii_lowercase();
            if ENV_FIELDS.contains(&field.as_str()) {
                self.apply_field(&field, &value)?;
                matched = true;
            }
        }
        Ok(matched)
    }

    /// Whether the record has everything needed for its kind
    pub fn is_complete(&self) -> bool {
        match self.kind {
            CredentialKind::UserPassword => self.user.is_some() && self.secret.is_some(),
            CredentialKind::Token => self.secret.is_some(),
        }
    }

    fn apply_field(&mut self, key: &str, value: &str) -> CredentialResult<()> {
        match key {
            "name" => {}
            "type" => self.kind = value.parse()?,
            "user" => self.user = Some(value.to_string()),
            "secret" => self.secret = Some(value.to_string()),
            "realm" => self.realm = Some(value.to_string()),
            other => {
                self.properties.insert(other.to_string(), value.to_string());
            }
        }
        Ok(())
    }
}

/// Fields that can be set through environment variables
pub const ENV_FIELDS: [&str; 4] = ["type", "user", "secret", "realm"];

/// Environment variable prefix for a credential name
///
/// Distinct names can share a prefix (`a-b` and `a_b`); the manager refuses
/// environment overrides for such names.
pub fn env_prefix(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}_", env_constants::CREDENTIAL_PREFIX, normalized)
}

/// Validate a credential name
pub fn validate_name(name: &str) -> CredentialResult<()> {
    let invalid = |reason: &str| CredentialError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.len() > credentials::MAX_NAME_LENGTH {
        return Err(invalid("name is too long"));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'))
    {
        return Err(invalid(
            "use alphanumeric characters with optional dots, hyphens, underscores or colons",
        ));
    }
    Ok(())
}

/// Prompt for a secret on the terminal without echo
pub fn prompt_secret(name: &str) -> CredentialResult<String> {
    let secret = rpassword::prompt_password(format!("Secret for credential '{}': ", name))?;
    if secret.is_empty() {
        return Err(CredentialError::EmptyInput {
            field: "Secret".to_string(),
        });
    }
    Ok(secret)
}

/// Prompt for a user name on the terminal
pub fn prompt_user(name: &str) -> CredentialResult<String> {
    print!("User for credential '{}': ", name);
    io::stdout().flush()?;

    let mut user = String::new();
    io::stdin().read_line(&mut user)?;
    let user = user.trim().to_string();
    if user.is_empty() {
        return Err(CredentialError::EmptyInput {
            field: "User".to_string(),
        });
    }
    Ok(user)
}
