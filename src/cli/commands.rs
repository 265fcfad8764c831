//! Command handlers for the credfetch CLI
//!
//! This module implements the command handlers that connect CLI arguments
//! with the downloader and the credential manager.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::app::{DownloadOptions, DownloadSource, Downloader};
use crate::auth::{prompt_secret, prompt_user, Credential, CredentialKind, CredentialManager};
use crate::cli::{CredentialsAction, CredentialsArgs, DownloadArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, CredentialError, Result};

/// Handle the download command
///
/// Collects the download specifications, applies CLI overrides on top of the
/// configured defaults and runs the batch.
pub async fn handle_download(args: DownloadArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    let start_time = Instant::now();
    args.validate().map_err(AppError::generic)?;

    let specs = collect_specs(&args).await?;
    info!("Collected {} download specification(s)", specs.len());

    let options = download_options(&args, config);
    let credentials = config.credential_manager()?;

    let spinner = create_spinner(quiet);
    spinner.set_message(format!("Downloading {} item(s)...", specs.len()));

    let output = SpinnerWriter {
        spinner: spinner.clone(),
        inner: io::stdout(),
    };
    let mut downloader =
        Downloader::with_config(&config.client, credentials)?.with_output(Box::new(output));

    let result = downloader
        .download(&DownloadSource::Specs(specs), &options)
        .await;
    spinner.finish_and_clear();

    let records = result?;
    let downloaded = records.iter().filter(|r| r.is_ok()).count();
    info!(
        "Download finished: {} of {} item(s) in {:?}",
        downloaded,
        records.len(),
        start_time.elapsed()
    );
    if !quiet {
        eprintln!(
            "✅ {} of {} file(s) downloaded in {:.1}s",
            downloaded,
            records.len(),
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

/// Merge CLI arguments over the configured download defaults
fn download_options(args: &DownloadArgs, config: &AppConfig) -> DownloadOptions {
    let mut options = config.download_options();
    options.credential = args.credential.clone();
    if let Some(on_failure) = args.on_failure {
        options.on_failure = on_failure;
    }
    if let Some(renderer) = args.renderer {
        options.result_renderer = renderer;
    }
    if args.force {
        options.force = true;
    }
    if let Some(dir) = &args.output_dir {
        options.destination_root = Some(dir.clone());
    }
    options
}

/// Specifications from the arguments followed by those from `--input`
///
/// The input is read on the blocking thread pool since it may be stdin.
async fn collect_specs(args: &DownloadArgs) -> Result<Vec<String>> {
    let mut specs = args.specs.clone();
    if let Some(input) = args.input.clone() {
        let from_input = tokio::task::spawn_blocking(move || read_specs(&input))
            .await
            .map_err(|e| AppError::generic(format!("Reading specifications failed: {}", e)))??;
        specs.extend(from_input);
    }
    Ok(specs)
}

/// Read specifications from a file, or stdin for `-`
///
/// Blank lines and lines starting with `#` are skipped.
fn read_specs(input: &Path) -> Result<Vec<String>> {
    let reader: Box<dyn BufRead> = if input == Path::new("-") {
        debug!("Reading download specifications from stdin");
        Box::new(BufReader::new(io::stdin()))
    } else {
        debug!("Reading download specifications from {}", input.display());
        Box::new(BufReader::new(File::open(input)?))
    };
    parse_spec_lines(reader)
}

fn parse_spec_lines(reader: impl BufRead) -> Result<Vec<String>> {
    let mut specs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        specs.push(line.to_string());
    }
    Ok(specs)
}

fn create_spinner(quiet: bool) -> ProgressBar {
    if quiet || !atty::is(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style.tick_strings(&["◐", "◓", "◑", "◒"]));
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Writes rendered records without tearing the spinner line
struct SpinnerWriter<W> {
    spinner: ProgressBar,
    inner: W,
}

impl<W: Write> Write for SpinnerWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.spinner.suspend(|| inner.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Handle credential management commands
pub async fn handle_credentials(args: CredentialsArgs, config: &AppConfig) -> Result<()> {
    let credman = config.credential_manager()?;

    match args.action {
        CredentialsAction::Set {
            name,
            kind,
            user,
            secret,
            realm,
        } => set_credential(&credman, name, kind, user, secret, realm)?,
        CredentialsAction::Get { name } => {
            let credential = credman.require(&name)?;
            print_credential(&credential);
        }
        CredentialsAction::List => {
            let credentials = credman.list()?;
            if credentials.is_empty() {
                println!("No credentials stored in {}", credman.store().path().display());
            }
            for credential in &credentials {
                println!(
                    "{:<24} {:<14} {}",
                    credential.name,
                    credential.kind,
                    credential.realm.as_deref().unwrap_or("-")
                );
            }
        }
        CredentialsAction::Remove { name } => {
            if !credman.remove(&name)? {
                return Err(CredentialError::NotFound { name }.into());
            }
            println!("🗑️  Removed credential '{}'", name);
        }
    }

    Ok(())
}

fn set_credential(
    credman: &CredentialManager,
    name: String,
    kind: Option<CredentialKind>,
    user: Option<String>,
    secret: Option<String>,
    realm: Option<String>,
) -> Result<()> {
    let existing = credman.get(&name)?;
    let kind = kind
        .or_else(|| existing.as_ref().map(|c| c.kind))
        .unwrap_or_default();
    let interactive = atty::is(atty::Stream::Stdin);

    let has_user = user.is_some() || existing.as_ref().is_some_and(|c| c.user.is_some());
    let user = match user {
        None if kind == CredentialKind::UserPassword && !has_user && interactive => {
            Some(prompt_user(&name)?)
        }
        other => other,
    };

    let has_secret = secret.is_some() || existing.as_ref().is_some_and(|c| c.secret.is_some());
    let secret = match secret {
        None if !has_secret && interactive => Some(prompt_secret(&name)?),
        other => other,
    };

    let credential = Credential {
        user,
        secret,
        realm,
        ..Credential::new(name, kind)
    };
    let complete = {
        let mut merged = existing.unwrap_or_else(|| credential.clone());
        merged.merge(credential.clone());
        merged.is_complete()
    };

    credman.set(credential.clone())?;
    println!("✅ Saved credential '{}'", credential.name);
    if !complete {
        println!("⚠️  Credential '{}' is incomplete for type {}", credential.name, kind);
    }
    Ok(())
}

fn print_credential(credential: &Credential) {
    println!("name:      {}", credential.name);
    println!("type:      {}", credential.kind);
    println!("user:      {}", credential.user.as_deref().unwrap_or("-"));
    println!(
        "secret:    {}",
        if credential.secret.is_some() { "<set>" } else { "<not set>" }
    );
    println!("realm:     {}", credential.realm.as_deref().unwrap_or("-"));
    match credential.last_used {
        Some(at) => println!("last used: {}", at.to_rfc3339()),
        None => println!("last used: never"),
    }
    for (key, value) in &credential.properties {
        println!("{:<10} {}", format!("{}:", key), value);
    }
}
