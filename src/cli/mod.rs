//! Command-line interface components
//!
//! This module contains CLI-specific code for credfetch, including argument
//! parsing and the command handlers.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, CredentialsAction, CredentialsArgs, DownloadArgs, GlobalArgs};
pub use commands::{handle_credentials, handle_download};
