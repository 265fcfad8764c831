//! File download operations with atomic writes and streaming
//!
//! This module opens requests, surfaces authentication challenges and
//! streams response bodies to disk through a temporary file that is renamed
//! into place once complete.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Response, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::auth::{AuthChallenge, Authorization};
use crate::app::client::http::HttpHandler;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// Outcome of opening a URL
#[derive(Debug)]
pub enum Opened {
    /// Server accepted the request
    Response(Response),
    /// Server demanded authentication
    Challenge(AuthChallenge),
}

/// Bytes written for one completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Number of bytes written
    pub bytes: u64,
    /// MD5 digest of the content, lowercase hex
    pub md5: String,
}

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Sends the request and classifies the response
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` for non-success statuses other than 401 and
    /// for transport failures
    pub async fn open(
        &self,
        url: &Url,
        authorization: Option<&Authorization>,
    ) -> DownloadResult<Opened> {
        let response = self.http_handler.get_response(url, authorization).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = AuthChallenge::from_headers(url, response.headers())?;
            tracing::debug!(
                "Authentication challenge for {}: {} (realm {})",
                url,
                challenge.scheme,
                challenge.realm
            );
            return Ok(Opened::Challenge(challenge));
        }

        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => DownloadError::NotFound {
                    url: url.to_string(),
                },
                StatusCode::FORBIDDEN => DownloadError::Forbidden {
                    url: url.to_string(),
                },
                status => DownloadError::ServerError {
                    status: status.as_u16(),
                },
            });
        }

        Ok(Opened::Response(response))
    }

    /// Streams a response body to `destination` with an atomic rename
    ///
    /// An existing destination is replaced. The temporary file is removed if
    /// anything fails.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - File I/O operations fail
    /// - The body stream fails or ends before the announced length
    /// - The final rename fails
    pub async fn save(&self, response: Response, destination: &Path) -> DownloadResult<Transfer> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = temp_path_for(destination);
        match Self::write_body(response, &temp_path).await {
            Ok(transfer) => {
                tokio::fs::rename(&temp_path, destination)
                    .await
                    .map_err(|_e| DownloadError::AtomicOperationFailed {
                        temp_path: temp_path.clone(),
                        final_path: destination.to_path_buf(),
                    })?;
                tracing::info!(
                    "Downloaded {} ({} bytes)",
                    destination.display(),
                    transfer.bytes
                );
                Ok(transfer)
            }
            Err(e) => {
                if temp_path.exists() {
                    let _ = tokio::fs::remove_file(&temp_path).await;
                }
                Err(e)
            }
        }
    }

    async fn write_body(response: Response, temp_path: &Path) -> DownloadResult<Transfer> {
        let expected = response.content_length();
        let mut file = File::create(temp_path).await?;
        let mut digest = md5::Context::new();
        let mut received: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            digest.consume(&chunk);
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
        }
        file.flush().await?;

        if let Some(expected) = expected {
            if received != expected {
                return Err(DownloadError::IncompleteDownload { received, expected });
            }
        }

        Ok(Transfer {
            bytes: received,
            md5: format!("{:x}", digest.compute()),
        })
    }
}

/// Temporary path next to `destination`, e.g. `file.tar` -> `file.tar.tmp`
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}
