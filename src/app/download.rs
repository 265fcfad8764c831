//! Download orchestration
//!
//! Resolves a [`DownloadSource`] into items, fetches each one (answering
//! authentication challenges from the credential manager) and turns the
//! outcomes into result records. Failures of individual items never abort
//! the process with a panic; they become records, and the batch raises
//! [`IncompleteResultsError`] according to [`OnFailure`].

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::client::{
    AuthChallenge, Authorization, ClientConfig, FetchClient, Opened, Transfer,
};
use crate::app::models::{DownloadItem, DownloadRecord, DownloadSource};
use crate::app::render::ResultRenderer;
use crate::auth::{Credential, CredentialManager};
use crate::errors::{AppError, DownloadError, DownloadResult, IncompleteResultsError, Result};

/// Behaviour when an item fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    /// Process every item, then raise with all failures
    #[default]
    Continue,
    /// Raise after the first failure
    Stop,
    /// Never raise; failures are only visible in the records
    Ignore,
}

impl fmt::Display for OnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OnFailure::Continue => "continue",
            OnFailure::Stop => "stop",
            OnFailure::Ignore => "ignore",
        };
        f.write_str(s)
    }
}

impl FromStr for OnFailure {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "continue" => Ok(OnFailure::Continue),
            "stop" => Ok(OnFailure::Stop),
            "ignore" => Ok(OnFailure::Ignore),
            other => Err(format!(
                "unknown failure mode '{}', expected continue, stop or ignore",
                other
            )),
        }
    }
}

/// Options for one download call
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Name of the credential to answer authentication challenges with
    pub credential: Option<String>,
    /// Failure handling
    pub on_failure: OnFailure,
    /// Record rendering
    pub result_renderer: ResultRenderer,
    /// Overwrite existing destinations
    pub force: bool,
    /// Root for single-URL sources and relative destinations; defaults to
    /// the current directory
    pub destination_root: Option<PathBuf>,
}

impl DownloadOptions {
    /// Options with rendering disabled
    pub fn quiet() -> Self {
        Self {
            result_renderer: ResultRenderer::Disabled,
            ..Default::default()
        }
    }

    /// Use the named credential
    pub fn with_credential(mut self, name: impl Into<String>) -> Self {
        self.credential = Some(name.into());
        self
    }
}

/// Fetches download sources with credential support
pub struct Downloader {
    client: FetchClient,
    credentials: CredentialManager,
    output: Box<dyn Write + Send>,
}

impl fmt::Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("client", &self.client)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Create a downloader; rendered records go to stdout
    pub fn new(client: FetchClient, credentials: CredentialManager) -> Self {
        Self {
            client,
            credentials,
            output: Box::new(io::stdout()),
        }
    }

    /// Create a downloader from a client configuration
    pub fn with_config(config: &ClientConfig, credentials: CredentialManager) -> Result<Self> {
        Ok(Self::new(FetchClient::with_config(config)?, credentials))
    }

    /// Send rendered records to `output` instead of stdout
    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = output;
        self
    }

    /// Credential manager used for authentication challenges
    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Download every item of `source`
    ///
    /// Returns one record per processed item. With [`OnFailure::Continue`]
    /// and [`OnFailure::Stop`] any non-ok record turns the call into
    /// [`AppError::IncompleteResults`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Download` if the source cannot be resolved into
    /// items and `AppError::IncompleteResults` if items failed.
    pub async fn download(
        &mut self,
        source: &DownloadSource,
        options: &DownloadOptions,
    ) -> Result<Vec<DownloadRecord>> {
        let root = match &options.destination_root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        let items = source.resolve(&root)?;
        info!("Downloading {} item(s)", items.len());

        let mut records = Vec::with_capacity(items.len());
        for item in &items {
            let record = match self.download_item(item, options).await {
                Ok((transfer, credential)) => DownloadRecord {
                    bytes: Some(transfer.bytes),
                    md5: Some(transfer.md5),
                    credential,
                    ..DownloadRecord::new(item.url.as_str(), item.destination.clone())
                },
                Err(e) => {
                    warn!("Download of {} failed: {}", item.url, e);
                    DownloadRecord::failed(item, &e)
                }
            };

            options
                .result_renderer
                .render(&record, self.output.as_mut())?;

            let failed = !record.is_ok();
            records.push(record);
            if failed && options.on_failure == OnFailure::Stop {
                break;
            }
        }
        self.output.flush()?;

        let failures = records.iter().filter(|r| !r.is_ok()).count();
        if failures > 0 && options.on_failure != OnFailure::Ignore {
            return Err(AppError::IncompleteResults(
                IncompleteResultsError::from_results(records),
            ));
        }
        Ok(records)
    }

    async fn download_item(
        &self,
        item: &DownloadItem,
        options: &DownloadOptions,
    ) -> DownloadResult<(Transfer, Option<String>)> {
        if item.destination.exists() && !options.force {
            return Err(DownloadError::FileExists {
                path: item.destination.display().to_string(),
            });
        }

        let challenge = match self.client.open(&item.url, None).await? {
            Opened::Response(response) => {
                let transfer = self.client.save(response, &item.destination).await?;
                return Ok((transfer, None));
            }
            Opened::Challenge(challenge) => challenge,
        };

        let credential = self.select_credential(item, &challenge, options)?;
        let authorization = Authorization::for_challenge(&credential, challenge.scheme)?;
        debug!(
            "Retrying {} with credential '{}'",
            item.url, credential.name
        );

        match self.client.open(&item.url, Some(&authorization)).await? {
            Opened::Response(response) => {
                let transfer = self.client.save(response, &item.destination).await?;
                if let Err(e) = self.credentials.mark_used(&credential.name, &challenge.realm) {
                    warn!("Could not update credential '{}': {}", credential.name, e);
                }
                Ok((transfer, Some(credential.name)))
            }
            Opened::Challenge(_) => Err(DownloadError::CredentialRejected {
                url: item.url.to_string(),
                credential: credential.name,
            }),
        }
    }

    fn select_credential(
        &self,
        item: &DownloadItem,
        challenge: &AuthChallenge,
        options: &DownloadOptions,
    ) -> DownloadResult<Credential> {
        if let Some(name) = &options.credential {
            return Ok(self.credentials.require(name)?);
        }

        match self.credentials.query_by_realm(&challenge.realm)? {
            Some(credential) => {
                debug!(
                    "Using credential '{}' registered for realm {}",
                    credential.name, challenge.realm
                );
                Ok(credential)
            }
            None => Err(DownloadError::AuthenticationRequired {
                url: item.url.to_string(),
                realm: challenge.realm.clone(),
            }),
        }
    }
}

/// Download `source` using the default client configuration
///
/// Credentials are looked up in `credentials`; rendered records go to stdout.
///
/// # Errors
///
/// See [`Downloader::download`].
pub async fn download(
    source: impl Into<DownloadSource>,
    credentials: &CredentialManager,
    options: &DownloadOptions,
) -> Result<Vec<DownloadRecord>> {
    let mut downloader = Downloader::new(FetchClient::new()?, credentials.clone());
    downloader.download(&source.into(), options).await
}
