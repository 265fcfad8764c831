//! HTTP client implementation
//!
//! This module provides the HTTP client used by downloads, with rate
//! limiting, exponential backoff and HTTP authentication challenges.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `auth`: `WWW-Authenticate` parsing and request authorization
//! - `http`: Core HTTP operations with resilience patterns
//! - `download`: Response streaming with atomic writes

use std::path::Path;

use reqwest::Response;
use url::Url;

use crate::errors::DownloadResult;

pub mod auth;
pub mod config;
pub mod download;
pub mod http;

pub use auth::{AuthChallenge, AuthScheme, Authorization};
pub use config::ClientConfig;
pub use download::{Opened, Transfer};

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client for fetching URLs to disk
///
/// Handles rate limiting, retries, authentication challenges and atomic
/// file writes.
#[derive(Debug)]
pub struct FetchClient {
    http_handler: HttpHandler,
}

impl FetchClient {
    /// Creates a new FetchClient with default configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if HTTP client creation fails
    pub fn new() -> DownloadResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Creates a new FetchClient with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if HTTP client creation fails
    pub fn with_config(config: &ClientConfig) -> DownloadResult<Self> {
        let http_handler = HttpHandler::new(config)?;
        tracing::debug!("Created HTTP client: {:?}", config);
        Ok(Self { http_handler })
    }

    /// Requests `url`, returning the response or the authentication challenge
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the HTTP request fails after retries or
    /// the server answers with an error status other than 401
    pub async fn open(
        &self,
        url: &Url,
        authorization: Option<&Authorization>,
    ) -> DownloadResult<Opened> {
        DownloadHandler::new(&self.http_handler)
            .open(url, authorization)
            .await
    }

    /// Streams an opened response to `destination`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if writing or renaming the file fails
    pub async fn save(&self, response: Response, destination: &Path) -> DownloadResult<Transfer> {
        DownloadHandler::new(&self.http_handler)
            .save(response, destination)
            .await
    }
}
