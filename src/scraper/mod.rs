//! Page fetching and markup-to-text normalization.
//!
//! [`PageFetcher`] performs the single HTTP GET of a run. A non-200 response is
//! not an error: it becomes a sentinel string that flows downstream as if it
//! were page content. [`TextNormalizer`] turns markup into one line of visible
//! text and keeps a debug snapshot of the stripped text on disk.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use scraper::{Html, Node};
use tracing::info;

use crate::error::{ConfigError, FetchError};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";
const PREFERRED_LANGUAGE: &str = "en-US,en;q=0.9";
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Elements whose text content is never rendered.
const INVISIBLE_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Default location of the stripped-text snapshot.
pub const DEFAULT_DEBUG_FILE: &str = "soup.txt";

/// Builds the string handed downstream in place of page content when the
/// server answers with anything but 200.
pub fn unavailable_sentinel(status: StatusCode) -> String {
    format!(
        "\"Error: Unable to fetch the URL. Status code: {}\"",
        status.as_u16()
    )
}

/// Result of a single page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedPage {
    /// HTTP 200 with the raw response body
    Html(String),
    /// Any other status; carries the sentinel text
    Unavailable { status: u16, sentinel: String },
}

pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(PREFERRED_LANGUAGE));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(FETCH_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }

    /// Issues the GET. Only transport failures are errors.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        info!("Fetching HTML text from URL: {}", url);

        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();

        if status != StatusCode::OK {
            return Ok(FetchedPage::Unavailable {
                status: status.as_u16(),
                sentinel: unavailable_sentinel(status),
            });
        }

        let body = response.text().await.map_err(request_error)?;
        Ok(FetchedPage::Html(body))
    }
}

/// Strips markup and records what it saw
#[derive(Debug)]
pub struct TextNormalizer {
    debug_path: PathBuf,
}

impl TextNormalizer {
    pub fn new(debug_path: impl Into<PathBuf>) -> Self {
        Self {
            debug_path: debug_path.into(),
        }
    }

    /// Writes the stripped text to the debug file, then returns it with line
    /// breaks flattened to spaces.
    pub async fn normalize(&self, html: &str) -> Result<String, FetchError> {
        let text = visible_text(html);

        tokio::fs::write(&self.debug_path, &text)
            .await
            .map_err(|source| FetchError::DebugFile {
                path: self.debug_path.clone(),
                source,
            })?;
        info!("Soup file saved to {}", self.debug_path.display());

        Ok(collapse_line_breaks(&text))
    }
}

/// Concatenates every text node that is not inside a non-rendered element.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);

    document
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some((node, text)),
            _ => None,
        })
        .filter(|(node, _)| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| INVISIBLE_ELEMENTS.contains(&el.name()))
            })
        })
        .map(|(_, text)| &**text)
        .collect()
}

pub fn collapse_line_breaks(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}
