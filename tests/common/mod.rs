// Shared helpers for integration tests: a tiny HTTP target on localhost
#![allow(dead_code)]

use sqlprobe::config::{ScanConfig, ScheduleEntry};
use sqlprobe::dictionary::DictionaryRef;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct Target {
    pub base: String,
    /// Raw text of every request received, in arrival order
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl Target {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn received(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a target that answers every request with `respond(raw_request) -> (status, body)`.
pub async fn spawn_target<F>(respond: F) -> Target
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let raw = read_request(&mut socket).await;
                log.lock().unwrap().push(raw.clone());
                let (status, body) = respond(&raw);
                let reply = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Target {
        base: format!("http://{}", addr),
        requests,
    }
}

/// A URL nothing listens on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api/items", port)
}

pub fn write_dictionary(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Config with no pauses, writing artifacts below `output_dir`.
pub fn fast_config(output_dir: &Path, dictionaries: &[PathBuf]) -> ScanConfig {
    ScanConfig {
        request_delay_ms: 0,
        dictionary_pause_ms: 0,
        request_timeout_ms: 5000,
        dictionary_dir: output_dir.to_path_buf(),
        output_dir: output_dir.join("logs"),
        schedule: dictionaries
            .iter()
            .map(|p| ScheduleEntry::immediate(DictionaryRef::Path(p.clone())))
            .collect(),
        ..ScanConfig::default()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut expected: Option<usize> = None;
    loop {
        if let Some(total) = expected {
            if buf.len() >= total {
                break;
            }
        }
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if expected.is_none() {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                expected = Some(end + 4 + length);
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
