//! Shared fixtures: a canned-response HTTP server and a scripted extractor.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use listing_extractor::error::AgentError;
use listing_extractor::models::Usage;
use listing_extractor::traits::{Extraction, ProductExtractor};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl StubResponse {
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    /// A successful chat-completions answer
    pub fn completion(content: &str, usage: (u64, u64)) -> Self {
        Self::json(
            200,
            json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": usage.0,
                    "completion_tokens": usage.1,
                    "total_tokens": usage.0 + usage.1
                }
            }),
        )
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

/// Serves the given responses in order, one per connection, repeating the
/// last one once the list runs out. Every raw request is recorded.
pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(responses: Vec<StubResponse>) -> Self {
        assert!(!responses.is_empty());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            let mut served = 0;
            while let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                recorded.lock().unwrap().push(request);

                let response = &responses[served.min(responses.len() - 1)];
                served += 1;

                let _ = stream.write_all(&response.to_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            url,
            requests,
            task,
        }
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// An address nothing listens on
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Extractor returning a fixed answer and remembering what it was shown
#[derive(Clone)]
pub struct CannedExtractor {
    answer: Result<String, String>,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl CannedExtractor {
    pub fn answering(output: impl Into<String>) -> Self {
        Self {
            answer: Ok(output.into()),
            seen: Arc::default(),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            answer: Err(reason.into()),
            seen: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductExtractor for CannedExtractor {
    async fn extract(&self, _url: &str, page_text: &str) -> Result<Extraction, AgentError> {
        self.seen.lock().unwrap().push(page_text.to_string());

        match &self.answer {
            Ok(output) => Ok(Extraction {
                output: output.clone(),
                usage: Usage {
                    input_tokens: 120,
                    output_tokens: 30,
                    total_tokens: 150,
                },
            }),
            Err(reason) => Err(AgentError::UnexpectedModelBehavior {
                attempts: 3,
                reason: reason.clone(),
            }),
        }
    }
}

pub fn csv_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();
    files
}

pub const LISTING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Beds</title><script>window.dataLayer = [];</script></head>
<body>
  <div class="product">
    <span class="brand">MALM</span>
    <span class="name">Bed frame, high</span>
    <span class="price">Rs.14,990</span>
    <span class="reviews">(412)</span>
  </div>
  <div class="product">
    <span class="name">Storage bed</span>
  </div>
  <div class="product">
    <span class="brand">HEMNES</span>
    <span class="name">Day-bed frame</span>
    <span class="price">Rs.22,990.50</span>
    <span class="reviews">(87)</span>
  </div>
</body>
</html>"#;

pub const THREE_PRODUCTS: &str = r#"{"dataset": [
    {"brand_name": "MALM", "product_name": "Bed frame, high", "price": 14990.0, "rating_count": 412},
    {"brand_name": "Unknown", "product_name": "Storage bed", "price": 0.0, "rating_count": 0},
    {"brand_name": "HEMNES", "product_name": "Day-bed frame", "price": 22990.5, "rating_count": 87}
]}"#;
