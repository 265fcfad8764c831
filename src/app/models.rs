//! Data models for credfetch
//!
//! This module defines the download target specification and the per-item
//! result records produced by a download.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::results;
use crate::errors::{DownloadError, DownloadResult};

/// Outcome of one requested item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Item completed
    Ok,
    /// Item could not be attempted, e.g. destination already exists
    Impossible,
    /// Item was attempted and failed
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "ok",
            Status::Impossible => "impossible",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Result record for one download item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Always `download`
    pub action: String,
    /// Item outcome
    pub status: Status,
    /// Source URL
    pub url: String,
    /// Destination path
    pub path: PathBuf,
    /// Human readable explanation for non-ok records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of bytes written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// MD5 digest of the downloaded content, lowercase hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    /// Name of the credential that authorized the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl DownloadRecord {
    /// Create an `ok` record without details
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            action: results::DOWNLOAD_ACTION.to_string(),
            status: Status::Ok,
            url: url.into(),
            path: path.into(),
            message: None,
            bytes: None,
            md5: None,
            credential: None,
        }
    }

    /// Record for a failed item
    pub fn failed(item: &DownloadItem, error: &DownloadError) -> Self {
        let status = match error {
            DownloadError::FileExists { .. }
            | DownloadError::NoFileName { .. }
            | DownloadError::InvalidUrl { .. } => Status::Impossible,
            _ => Status::Error,
        };
        Self {
            status,
            message: Some(error_chain(error)),
            ..Self::new(item.url.as_str(), item.destination.clone())
        }
    }

    /// Whether this record reports success
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// Every record reports `ok`
pub fn check_results(records: &[DownloadRecord]) -> bool {
    records.iter().all(DownloadRecord::is_ok)
}

fn error_chain(error: &DownloadError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}

/// One URL and where to store it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    /// Source URL
    pub url: Url,
    /// Destination path
    pub destination: PathBuf,
}

impl DownloadItem {
    /// Create an item with an explicit destination
    pub fn new(url: &str, destination: impl Into<PathBuf>) -> DownloadResult<Self> {
        Ok(Self {
            url: parse_url(url)?,
            destination: destination.into(),
        })
    }

    /// Create an item whose destination is the last URL path segment in `root`
    pub fn from_url(url: &str, root: &Path) -> DownloadResult<Self> {
        let url = parse_url(url)?;
        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DownloadError::NoFileName {
                url: url.to_string(),
            })?
            .to_string();
        Ok(Self {
            destination: root.join(file_name),
            url,
        })
    }
}

fn parse_url(url: &str) -> DownloadResult<Url> {
    Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })
}

/// What to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    /// A single URL, stored under its file name
    Url(String),
    /// Source URL to destination path
    Map(BTreeMap<String, PathBuf>),
    /// Individual specifications, see [`DownloadSource::parse_spec`]
    Specs(Vec<String>),
}

impl DownloadSource {
    /// Resolve into items; relative destinations are joined onto `root`
    ///
    /// Map sources are resolved in URL order.
    pub fn resolve(&self, root: &Path) -> DownloadResult<Vec<DownloadItem>> {
        match self {
            DownloadSource::Url(url) => Ok(vec![DownloadItem::from_url(url, root)?]),
            DownloadSource::Map(map) => map
                .iter()
                .map(|(url, path)| DownloadItem::new(url, root.join(path)))
                .collect(),
            DownloadSource::Specs(specs) => specs
                .iter()
                .map(|spec| Self::parse_spec(spec, root))
                .collect(),
        }
    }

    /// Parse a textual item specification
    ///
    /// Accepted forms: `URL`, `URL PATH` (whitespace separated) and a JSON
    /// object `{"url": "...", "path": "..."}` with an optional `path`.
    pub fn parse_spec(spec: &str, root: &Path) -> DownloadResult<DownloadItem> {
        let spec = spec.trim();
        let invalid = || DownloadError::InvalidSpec {
            spec: spec.to_string(),
        };

        if spec.starts_with('{') {
            #[derive(Deserialize)]
            struct JsonSpec {
                url: String,
                path: Option<PathBuf>,
            }
            let parsed: JsonSpec = serde_json::from_str(spec).map_err(|_| invalid())?;
            return match parsed.path {
                Some(path) => DownloadItem::new(&parsed.url, root.join(path)),
                None => DownloadItem::from_url(&parsed.url, root),
            };
        }

        let mut parts = spec.splitn(2, char::is_whitespace);
        let url = parts.next().filter(|u| !u.is_empty()).ok_or_else(invalid)?;
        match parts.next().map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => DownloadItem::new(url, root.join(path)),
            None => DownloadItem::from_url(url, root),
        }
    }
}

impl From<&str> for DownloadSource {
    fn from(url: &str) -> Self {
        DownloadSource::Url(url.to_string())
    }
}

impl From<String> for DownloadSource {
    fn from(url: String) -> Self {
        DownloadSource::Url(url)
    }
}

impl<P: Into<PathBuf>> FromIterator<(String, P)> for DownloadSource {
    fn from_iter<I: IntoIterator<Item = (String, P)>>(iter: I) -> Self {
        DownloadSource::Map(iter.into_iter().map(|(u, p)| (u, p.into())).collect())
    }
}
