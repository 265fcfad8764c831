//! Shared fixtures for integration tests
//!
//! `DataServer` is a minimal HTTP/1.1 server with one Basic-protected file,
//! one Bearer-protected file and one public file. Every request's path and
//! `Authorization` header are recorded so tests can check what was sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use credfetch::app::ClientConfig;
use credfetch::auth::CredentialManager;

pub const PROTECTED_PATH: &str = "study_1/visit_1_dicom.tar";
pub const PUBLIC_PATH: &str = "public/readme.txt";
pub const TOKEN_PATH: &str = "token/results.csv";

pub const BASIC_REALM: &str = "Data Access";
pub const BEARER_REALM: &str = "Token Access";

/// `mike:dataaccess-secret`
const EXPECTED_BASIC: &str = "Basic bWlrZTpkYXRhYWNjZXNzLXNlY3JldA==";
const EXPECTED_BEARER: &str = "Bearer dataaccess-token";

pub const DICOM_TAR: &[u8] = b"DICM\x00\x01visit-1 study-1 payload\n";
pub const README: &[u8] = b"Public study information\n";
pub const RESULTS_CSV: &[u8] = b"subject,score\n1,42\n";

/// A request as seen by the server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
}

/// Test web server serving study data
pub struct DataServer {
    base: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl DataServer {
    /// Start the server on an ephemeral port; it runs until the process exits
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let recorded = Arc::clone(&recorded);
                thread::spawn(move || handle(stream, &recorded));
            }
        });

        Self {
            base: format!("http://127.0.0.1:{}", port),
            requests,
        }
    }

    /// Absolute URL for `path`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    /// Realm identifier the server's Basic challenge maps to
    pub fn basic_realm(&self) -> String {
        format!("{}/{}", self.base, BASIC_REALM)
    }

    /// Requests received so far for `path`
    pub fn requests_for(&self, path: &str) -> Vec<RecordedRequest> {
        let wanted = format!("/{}", path);
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == wanted)
            .cloned()
            .collect()
    }
}

fn handle(mut stream: TcpStream, recorded: &Mutex<Vec<RecordedRequest>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let Some(request) = read_request(&mut stream) else {
        return;
    };
    recorded.lock().unwrap().push(request.clone());

    let authorization = request.authorization.as_deref();
    let response = match request.path.trim_start_matches('/') {
        PROTECTED_PATH if authorization == Some(EXPECTED_BASIC) => ok(DICOM_TAR),
        PROTECTED_PATH => unauthorized(&format!("Basic realm=\"{}\"", BASIC_REALM)),
        TOKEN_PATH if authorization == Some(EXPECTED_BEARER) => ok(RESULTS_CSV),
        TOKEN_PATH => unauthorized(&format!("Bearer realm=\"{}\"", BEARER_REALM)),
        PUBLIC_PATH => ok(README),
        _ => not_found(),
    };
    let _ = stream.write_all(&response);
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }

    let text = String::from_utf8_lossy(&data);
    let mut lines = text.split("\r\n");
    let path = lines.next()?.split_whitespace().nth(1)?.to_string();
    let authorization = lines.find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("authorization")
            .then(|| value.trim().to_string())
    });

    Some(RecordedRequest {
        path,
        authorization,
    })
}

fn ok(body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

fn unauthorized(challenge: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        challenge
    )
    .into_bytes()
}

fn not_found() -> Vec<u8> {
    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec()
}

/// Credential manager on a fresh store file inside `dir`
///
/// Environment overrides are disabled so parallel tests cannot leak into
/// each other.
pub fn tmp_keyring(dir: &Path) -> CredentialManager {
    CredentialManager::with_store_path(dir.join("keyring.toml")).without_env()
}

/// Field map of the `dataaccess` credential the server accepts
pub fn dataaccess_credential() -> HashMap<String, String> {
    fields(&[
        ("name", "dataaccess"),
        ("type", "user_password"),
        ("user", "mike"),
        ("secret", "dataaccess-secret"),
    ])
}

pub fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Client configuration without retries or meaningful rate limiting
pub fn fast_client_config() -> ClientConfig {
    ClientConfig {
        request_timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(5),
        rate_limit_rps: 1000,
        max_retries: 0,
        retry_base_delay: Duration::from_millis(10),
        ..Default::default()
    }
}

/// In-memory sink for rendered result records
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
