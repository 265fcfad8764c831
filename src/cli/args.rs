//! Command-line argument parsing for credfetch
//!
//! This module defines the CLI structure using clap derive macros,
//! providing downloads and credential management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::{OnFailure, ResultRenderer};
use crate::auth::CredentialKind;

/// credfetch - Download files from servers that require authentication
#[derive(Parser, Debug)]
#[command(
    name = "credfetch",
    version,
    about = "Download files over HTTP using named credentials",
    long_about = "Downloads files over HTTP, answering Basic and Bearer authentication challenges
with credentials kept in a local credential store."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download one or more URLs
    Download(DownloadArgs),

    /// Manage stored credentials
    Credentials(CredentialsArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// Download specifications: `URL`, `URL PATH` or a JSON object with
    /// `url` and `path`
    #[arg(value_name = "SPEC")]
    pub specs: Vec<String>,

    /// Read additional specifications from FILE, one per line (`-` for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Name of the credential to use for authentication challenges
    #[arg(short, long, value_name = "NAME")]
    pub credential: Option<String>,

    /// Behaviour when a download fails (continue, stop, ignore)
    #[arg(long, value_name = "MODE")]
    pub on_failure: Option<OnFailure>,

    /// Result rendering (disabled, default, json)
    #[arg(long, value_name = "MODE")]
    pub renderer: Option<ResultRenderer>,

    /// Overwrite existing files
    #[arg(short, long)]
    pub force: bool,

    /// Directory that relative destinations are placed in
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for credential management
#[derive(Args, Debug)]
pub struct CredentialsArgs {
    #[command(subcommand)]
    pub action: CredentialsAction,
}

/// Credential management actions
#[derive(Subcommand, Debug)]
pub enum CredentialsAction {
    /// Create or update a credential
    Set {
        /// Credential name
        name: String,

        /// Credential type (user_password, token)
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        kind: Option<CredentialKind>,

        /// User name
        #[arg(short, long)]
        user: Option<String>,

        /// Secret; prompted for when omitted on a terminal
        #[arg(short, long)]
        secret: Option<String>,

        /// Realm the credential applies to
        #[arg(short, long)]
        realm: Option<String>,
    },

    /// Show a credential (the secret is never printed)
    Get {
        /// Credential name
        name: String,
    },

    /// List stored credentials
    List,

    /// Remove a credential
    Remove {
        /// Credential name
        name: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl DownloadArgs {
    /// Check that there is something to download
    pub fn validate(&self) -> Result<(), String> {
        if self.specs.is_empty() && self.input.is_none() {
            return Err("Nothing to download: give at least one SPEC or --input".to_string());
        }

        if let Some(name) = &self.credential {
            crate::auth::validate_name(name).map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}
