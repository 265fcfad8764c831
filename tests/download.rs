//! Integration tests for authenticated downloads
//!
//! These tests run the downloader against a local data server that protects
//! a study archive with Basic authentication.

mod common;

use std::fs;

use credfetch::app::{
    check_results, DownloadOptions, DownloadSource, Downloader, OnFailure, ResultRenderer, Status,
};
use credfetch::auth::{Credential, CredentialManager};
use credfetch::AppError;
use tempfile::TempDir;

use common::*;

fn downloader(credman: CredentialManager) -> Downloader {
    Downloader::with_config(&fast_client_config(), credman).unwrap()
}

fn options_in(dir: &TempDir) -> DownloadOptions {
    DownloadOptions {
        destination_root: Some(dir.path().to_path_buf()),
        ..DownloadOptions::quiet()
    }
}

#[tokio::test]
async fn test_download_without_credential_is_incomplete() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader(tmp_keyring(temp_dir.path()));

    let result = downloader
        .download(
            &DownloadSource::from(server.url(PROTECTED_PATH)),
            &options_in(&temp_dir),
        )
        .await;

    match result {
        Err(AppError::IncompleteResults(e)) => {
            assert_eq!(e.results.len(), 1);
            assert_eq!(e.failed[0].status, Status::Error);
            let message = e.failed[0].message.as_deref().unwrap();
            assert!(message.contains("Authentication required"), "{}", message);
            assert!(message.contains(BASIC_REALM), "{}", message);
        }
        other => panic!("Expected IncompleteResults, got {:?}", other),
    }
    assert!(!temp_dir.path().join("visit_1_dicom.tar").exists());
}

#[tokio::test]
async fn test_download_with_named_credential() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let credman = tmp_keyring(temp_dir.path());
    credman.set_fields(&dataaccess_credential()).unwrap();

    let mut downloader = downloader(credman.clone());
    let records = downloader
        .download(
            &DownloadSource::from(server.url(PROTECTED_PATH)),
            &options_in(&temp_dir).with_credential("dataaccess"),
        )
        .await
        .unwrap();

    assert!(check_results(&records));
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.action, "download");
    assert_eq!(record.credential.as_deref(), Some("dataaccess"));
    assert_eq!(record.bytes, Some(DICOM_TAR.len() as u64));
    assert_eq!(
        record.md5.as_deref(),
        Some(format!("{:x}", md5::compute(DICOM_TAR)).as_str())
    );

    let target = temp_dir.path().join("visit_1_dicom.tar");
    assert_eq!(record.path, target);
    assert_eq!(fs::read(&target).unwrap(), DICOM_TAR);
    assert!(!temp_dir.path().join("visit_1_dicom.tar.tmp").exists());

    // The first attempt carries no credentials
    let requests = server.requests_for(PROTECTED_PATH);
    assert_eq!(requests.len(), 2);
    assert!(requests[0].authorization.is_none());
    assert!(requests[1].authorization.as_deref().unwrap().starts_with("Basic "));

    // Successful use records the realm and timestamp
    let stored = credman.require("dataaccess").unwrap();
    assert_eq!(stored.realm.as_deref(), Some(server.basic_realm().as_str()));
    assert!(stored.last_used.is_some());
}

#[tokio::test]
async fn test_download_mapping_with_credential() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let credman = tmp_keyring(temp_dir.path());
    credman.set_fields(&dataaccess_credential()).unwrap();

    let target = temp_dir.path().join("target");
    let source: DownloadSource = vec![(server.url(PROTECTED_PATH), target.clone())]
        .into_iter()
        .collect();

    let records = credfetch::download(
        source,
        &credman,
        &DownloadOptions::quiet().with_credential("dataaccess"),
    )
    .await
    .unwrap();

    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.status == Status::Ok));
    assert!(target.exists());
}

#[tokio::test]
async fn test_realm_lookup_after_first_use() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let credman = tmp_keyring(temp_dir.path());
    credman.set_fields(&dataaccess_credential()).unwrap();
    let mut downloader = downloader(credman);

    let first = temp_dir.path().join("first");
    downloader
        .download(
            &DownloadSource::from(server.url(PROTECTED_PATH)),
            &DownloadOptions {
                destination_root: Some(first.clone()),
                ..DownloadOptions::quiet().with_credential("dataaccess")
            },
        )
        .await
        .unwrap();

    let second = temp_dir.path().join("second");
    let records = downloader
        .download(
            &DownloadSource::from(server.url(PROTECTED_PATH)),
            &DownloadOptions {
                destination_root: Some(second.clone()),
                ..DownloadOptions::quiet()
            },
        )
        .await
        .unwrap();

    assert_eq!(records[0].credential.as_deref(), Some("dataaccess"));
    assert_eq!(fs::read(second.join("visit_1_dicom.tar")).unwrap(), DICOM_TAR);
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let credman = tmp_keyring(temp_dir.path());
    credman
        .set(Credential::user_password("dataaccess", "mike", "wrong"))
        .unwrap();

    let result = downloader(credman.clone())
        .download(
            &DownloadSource::from(server.url(PROTECTED_PATH)),
            &options_in(&temp_dir).with_credential("dataaccess"),
        )
        .await;

    match result {
        Err(AppError::IncompleteResults(e)) => {
            let message = e.failed[0].message.as_deref().unwrap();
            assert!(message.contains("was rejected"), "{}", message);
        }
        other => panic!("Expected IncompleteResults, got {:?}", other),
    }
    assert!(!temp_dir.path().join("visit_1_dicom.tar").exists());

    // A rejected credential is not bound to the realm
    let stored = credman.require("dataaccess").unwrap();
    assert!(stored.realm.is_none());
    assert!(stored.last_used.is_none());
}

#[tokio::test]
async fn test_unknown_credential_name() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();

    let result = downloader(tmp_keyring(temp_dir.path()))
        .download(
            &DownloadSource::from(server.url(PROTECTED_PATH)),
            &options_in(&temp_dir).with_credential("nonexistent"),
        )
        .await;

    match result {
        Err(AppError::IncompleteResults(e)) => {
            let message = e.failed[0].message.as_deref().unwrap();
            assert!(message.contains("Credential not found: nonexistent"), "{}", message);
        }
        other => panic!("Expected IncompleteResults, got {:?}", other),
    }
}

#[tokio::test]
async fn test_public_file_needs_no_credential() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();

    let records = downloader(tmp_keyring(temp_dir.path()))
        .download(
            &DownloadSource::from(server.url(PUBLIC_PATH)),
            &options_in(&temp_dir).with_credential("dataaccess"),
        )
        .await
        .unwrap();

    assert!(check_results(&records));
    assert!(records[0].credential.is_none());
    assert_eq!(fs::read(temp_dir.path().join("readme.txt")).unwrap(), README);

    let requests = server.requests_for(PUBLIC_PATH);
    assert_eq!(requests.len(), 1);
    assert!(requests[0].authorization.is_none());
}

#[tokio::test]
async fn test_bearer_token_credential() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let credman = tmp_keyring(temp_dir.path());
    credman
        .set(Credential::token("results-token", "dataaccess-token"))
        .unwrap();

    let records = downloader(credman)
        .download(
            &DownloadSource::from(server.url(TOKEN_PATH)),
            &options_in(&temp_dir).with_credential("results-token"),
        )
        .await
        .unwrap();

    assert!(check_results(&records));
    assert_eq!(
        fs::read(temp_dir.path().join("results.csv")).unwrap(),
        RESULTS_CSV
    );
}

#[tokio::test]
async fn test_on_failure_continue_processes_everything() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();

    let source = DownloadSource::Specs(vec![
        server.url(PROTECTED_PATH),
        server.url(PUBLIC_PATH),
        server.url("missing/file.dat"),
    ]);
    let result = downloader(tmp_keyring(temp_dir.path()))
        .download(&source, &options_in(&temp_dir))
        .await;

    match result {
        Err(AppError::IncompleteResults(e)) => {
            assert_eq!(e.results.len(), 3);
            assert_eq!(e.failed.len(), 2);
            assert!(e.failed[1].message.as_deref().unwrap().contains("Not found"));
        }
        other => panic!("Expected IncompleteResults, got {:?}", other),
    }
    assert!(temp_dir.path().join("readme.txt").exists());
}

#[tokio::test]
async fn test_on_failure_stop_halts_after_first_failure() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();

    let source = DownloadSource::Specs(vec![server.url(PROTECTED_PATH), server.url(PUBLIC_PATH)]);
    let result = downloader(tmp_keyring(temp_dir.path()))
        .download(
            &source,
            &DownloadOptions {
                on_failure: OnFailure::Stop,
                ..options_in(&temp_dir)
            },
        )
        .await;

    match result {
        Err(AppError::IncompleteResults(e)) => assert_eq!(e.results.len(), 1),
        other => panic!("Expected IncompleteResults, got {:?}", other),
    }
    assert!(!temp_dir.path().join("readme.txt").exists());
    assert!(server.requests_for(PUBLIC_PATH).is_empty());
}

#[tokio::test]
async fn test_on_failure_ignore_returns_records() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();

    let source = DownloadSource::Specs(vec![server.url(PROTECTED_PATH), server.url(PUBLIC_PATH)]);
    let records = downloader(tmp_keyring(temp_dir.path()))
        .download(
            &source,
            &DownloadOptions {
                on_failure: OnFailure::Ignore,
                ..options_in(&temp_dir)
            },
        )
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert!(!check_results(&records));
    assert_eq!(records[0].status, Status::Error);
    assert_eq!(records[1].status, Status::Ok);
}

#[tokio::test]
async fn test_existing_destination_requires_force() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("readme.txt");
    fs::write(&target, b"stale").unwrap();

    let mut downloader = downloader(tmp_keyring(temp_dir.path()));
    let source = DownloadSource::from(server.url(PUBLIC_PATH));

    let result = downloader.download(&source, &options_in(&temp_dir)).await;
    match result {
        Err(AppError::IncompleteResults(e)) => {
            assert_eq!(e.failed[0].status, Status::Impossible)
        }
        other => panic!("Expected IncompleteResults, got {:?}", other),
    }
    assert_eq!(fs::read(&target).unwrap(), b"stale");

    let records = downloader
        .download(
            &source,
            &DownloadOptions {
                force: true,
                ..options_in(&temp_dir)
            },
        )
        .await
        .unwrap();
    assert!(check_results(&records));
    assert_eq!(fs::read(&target).unwrap(), README);
}

#[tokio::test]
async fn test_json_renderer_output() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let buffer = SharedBuffer::default();

    let mut downloader = downloader(tmp_keyring(temp_dir.path())).with_output(Box::new(buffer.clone()));
    let source: DownloadSource = vec![(server.url(PUBLIC_PATH), "docs/info.txt")]
        .into_iter()
        .collect();
    downloader
        .download(
            &source,
            &DownloadOptions {
                result_renderer: ResultRenderer::Json,
                ..options_in(&temp_dir)
            },
        )
        .await
        .unwrap();

    let output = buffer.contents();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1);

    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["action"], "download");
    assert_eq!(value["status"], "ok");
    assert_eq!(value["url"], server.url(PUBLIC_PATH));
    assert!(temp_dir.path().join("docs/info.txt").exists());
}

#[tokio::test]
async fn test_default_renderer_output() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();
    let buffer = SharedBuffer::default();

    let mut downloader = downloader(tmp_keyring(temp_dir.path())).with_output(Box::new(buffer.clone()));
    let _ = downloader
        .download(
            &DownloadSource::from(server.url(PROTECTED_PATH)),
            &DownloadOptions {
                result_renderer: ResultRenderer::Default,
                ..options_in(&temp_dir)
            },
        )
        .await;

    let output = buffer.contents();
    assert!(output.starts_with("download(error): "), "{}", output);
    assert!(output.contains("[Authentication required"), "{}", output);
}

#[tokio::test]
async fn test_environment_only_credential() {
    let server = DataServer::start();
    let temp_dir = TempDir::new().unwrap();

    std::env::set_var("CREDFETCH_CREDENTIAL_ENVACCESS_USER", "mike");
    std::env::set_var("CREDFETCH_CREDENTIAL_ENVACCESS_SECRET", "dataaccess-secret");

    let credman = CredentialManager::with_store_path(temp_dir.path().join("keyring.toml"));
    let records = downloader(credman.clone())
        .download(
            &DownloadSource::from(server.url(PROTECTED_PATH)),
            &options_in(&temp_dir).with_credential("envaccess"),
        )
        .await
        .unwrap();

    assert!(check_results(&records));
    assert_eq!(records[0].credential.as_deref(), Some("envaccess"));
    // Nothing is written for credentials that only exist in the environment
    assert!(credman.list().unwrap().is_empty());
}
