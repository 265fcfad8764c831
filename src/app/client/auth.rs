//! HTTP authentication challenges
//!
//! This module parses `WWW-Authenticate` challenges and turns credentials
//! into request authorization for the Basic and Bearer schemes.

use std::fmt;

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use reqwest::RequestBuilder;
use url::Url;

use crate::auth::{Credential, CredentialKind};
use crate::errors::{CredentialError, DownloadError, DownloadResult};

/// Supported authentication schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// RFC 7617 Basic
    Basic,
    /// RFC 6750 Bearer
    Bearer,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::Basic => f.write_str("Basic"),
            AuthScheme::Bearer => f.write_str("Bearer"),
        }
    }
}

/// A parsed authentication challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Requested scheme
    pub scheme: AuthScheme,
    /// Realm identifier, `<origin>/<realm>`
    pub realm: String,
}

impl AuthChallenge {
    /// Parse the first supported challenge from the response headers
    ///
    /// A header value may carry several comma-separated challenges. A 401
    /// without any challenge is treated as Basic with an empty realm name,
    /// so the realm identifier degrades to the origin.
    pub fn from_headers(url: &Url, headers: &HeaderMap) -> DownloadResult<Self> {
        let mut unsupported = None;
        for value in headers.get_all(WWW_AUTHENTICATE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for challenge in parse_challenges(value) {
                let scheme = match challenge.scheme.to_ascii_lowercase().as_str() {
                    "basic" => AuthScheme::Basic,
                    "bearer" => AuthScheme::Bearer,
                    _ => {
                        if unsupported.is_none() {
                            unsupported = Some(challenge.scheme);
                        }
                        continue;
                    }
                };
                let realm = challenge
                    .params
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("realm"))
                    .map(|(_, value)| value.as_str());
                return Ok(Self {
                    scheme,
                    realm: realm_id(url, realm),
                });
            }
        }

        match unsupported {
            Some(scheme) => Err(DownloadError::UnsupportedScheme { scheme }),
            None => Ok(Self {
                scheme: AuthScheme::Basic,
                realm: realm_id(url, None),
            }),
        }
    }
}

/// One challenge of a `WWW-Authenticate` value
#[derive(Debug, PartialEq, Eq)]
struct RawChallenge {
    scheme: String,
    params: Vec<(String, String)>,
}

/// Split a `WWW-Authenticate` value into challenges (RFC 7235 section 4.1)
///
/// Elements are separated by commas outside quoted strings. An element whose
/// first word is not followed by `=` starts a new challenge; anything else is
/// a parameter of the current one.
fn parse_challenges(value: &str) -> Vec<RawChallenge> {
    let mut challenges: Vec<RawChallenge> = Vec::new();

    for element in split_outside_quotes(value) {
        let element = element.trim();
        if element.is_empty() {
            continue;
        }

        let word_end = element
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(element.len());
        let (word, rest) = element.split_at(word_end);
        let starts_param = rest.trim_start().starts_with('=');

        if starts_param {
            if let Some(current) = challenges.last_mut() {
                current.params.push(parse_param(word, rest));
            }
            continue;
        }

        let mut challenge = RawChallenge {
            scheme: word.to_string(),
            params: Vec::new(),
        };
        let rest = rest.trim();
        if let Some(eq) = rest.find('=') {
            let (key, value) = rest.split_at(eq);
            // token68 padding such as `YIIB==` carries no value
            let padding_only = value.trim_start_matches('=').trim().is_empty();
            if !key.trim().is_empty() && !padding_only {
                challenge.params.push(parse_param(key, value));
            }
        }
        challenges.push(challenge);
    }

    challenges
}

fn split_outside_quotes(value: &str) -> Vec<String> {
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in value.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                elements.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    elements.push(current);
    elements
}

/// `key` and `= value`, with the value unquoted
fn parse_param(key: &str, rest: &str) -> (String, String) {
    let value = rest.trim_start().trim_start_matches('=').trim();
    (key.trim().to_string(), unquote(value))
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn realm_id(url: &Url, realm: Option<&str>) -> String {
    let origin = url.origin().ascii_serialization();
    match realm {
        Some(realm) if !realm.is_empty() => format!("{}/{}", origin, realm),
        _ => origin,
    }
}

/// Authorization to attach to a request
#[derive(Clone)]
pub enum Authorization {
    /// Basic credentials
    Basic { user: String, secret: String },
    /// Bearer token
    Bearer { token: String },
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authorization::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .finish_non_exhaustive(),
            Authorization::Bearer { .. } => f.debug_struct("Bearer").finish_non_exhaustive(),
        }
    }
}

impl Authorization {
    /// Build the authorization a credential provides for `scheme`
    pub fn for_challenge(credential: &Credential, scheme: AuthScheme) -> DownloadResult<Self> {
        let missing = |field: &str| {
            DownloadError::Credential(CredentialError::IncompleteCredential {
                name: credential.name.clone(),
                field: field.to_string(),
                scheme: scheme.to_string(),
            })
        };

        let secret = credential.secret.clone().ok_or_else(|| missing("secret"))?;
        match scheme {
            AuthScheme::Basic => {
                if credential.kind == CredentialKind::Token {
                    return Err(missing("user"));
                }
                let user = credential.user.clone().ok_or_else(|| missing("user"))?;
                Ok(Authorization::Basic { user, secret })
            }
            AuthScheme::Bearer => Ok(Authorization::Bearer { token: secret }),
        }
    }

    /// Attach to a request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Authorization::Basic { user, secret } => request.basic_auth(user, Some(secret)),
            Authorization::Bearer { token } => request.bearer_auth(token),
        }
    }
}
