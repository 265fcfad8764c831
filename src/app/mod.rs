//! Core application components
//!
//! - `client`: HTTP client with rate limiting, retries and authentication challenges
//! - `models`: download sources, items and result records
//! - `download`: orchestration of a batch of downloads
//! - `render`: result record rendering

pub mod client;
pub mod download;
pub mod models;
pub mod render;

pub use client::{AuthChallenge, AuthScheme, Authorization, ClientConfig, FetchClient};
pub use download::{download, DownloadOptions, Downloader, OnFailure};
pub use models::{check_results, DownloadItem, DownloadRecord, DownloadSource, Status};
pub use render::ResultRenderer;
