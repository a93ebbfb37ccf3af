//! # Extraction Agent
//!
//! Chat-completions client that asks a deployed model to turn listing-page text
//! into product JSON. The agent makes no promise about the shape of what comes
//! back; callers run the answer through [`crate::validator`].
//!
//! ## Retries
//!
//! A request is retried up to [`AgentConfig::max_retries`] times when:
//! - the request fails in transport (connect, timeout)
//! - the API answers 429 or 5xx
//! - the response carries no message content
//!
//! Any other status fails at once. Either way the caller sees
//! [`AgentError::UnexpectedModelBehavior`].
//!
//! ## Usage accounting
//!
//! Token counts from every response that reported them are summed, including
//! attempts that were later retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::error::{AgentError, ConfigError};
use crate::models::{ChatMessage, ChatRequest, ChatResponse, Usage};
use crate::traits::{Extraction, ProductExtractor};

pub const AGENT_NAME: &str = "web_scraping_agent";

const RETRY_DELAY: Duration = Duration::from_millis(500);

pub const SYSTEM_PROMPT: &str = r#"You are a web scraping agent that extracts product information from e-commerce web pages.

You are given the visible text of a product listing page. Extract product information from it and return it in the exact JSON structure specified.

You MUST return the data in this exact JSON format:
{
    "dataset": [
        {
            "brand_name": "string",
            "product_name": "string",
            "price": float,
            "rating_count": integer
        }
    ]
}

Extract all available products from the page. If a field is missing, use reasonable defaults:
- brand_name: "Unknown" if not found
- product_name: use the product title/name
- price: 0.0 if not found or not parseable
- rating_count: 0 if not found

Return only valid JSON in the specified structure."#;

/// Outcome of a single failed request
enum AttemptError {
    Retryable(String),
    Fatal(String),
}

pub struct ExtractionAgent {
    client: Client,
    config: AgentConfig,
}

impl ExtractionAgent {
    pub fn new(config: AgentConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { client, config })
    }

    fn build_request(&self, url: &str, page_text: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!("URL: {url}\n\nPage text:\n{page_text}")),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    async fn send(&self, request: &ChatRequest, usage: &mut Usage) -> Result<String, AttemptError> {
        let response = self
            .client
            .post(self.config.completions_url())
            .header("api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = format!("model API returned {status}: {body}");

            return if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Err(AttemptError::Retryable(reason))
            } else {
                Err(AttemptError::Fatal(reason))
            };
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Retryable(format!("unreadable model response: {e}")))?;

        if let Some(reported) = body.usage {
            usage.add(reported.into());
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AttemptError::Retryable("model response had no content".to_string()))
    }
}

#[async_trait]
impl ProductExtractor for ExtractionAgent {
    async fn extract(&self, url: &str, page_text: &str) -> Result<Extraction, AgentError> {
        let request = self.build_request(url, page_text);
        let max_attempts = self.config.max_retries + 1;
        let mut usage = Usage::default();

        info!(
            "{} requesting extraction from model {} ({} chars of page text)",
            AGENT_NAME,
            self.config.model,
            page_text.len()
        );

        let mut attempt = 1;
        loop {
            match self.send(&request, &mut usage).await {
                Ok(output) => return Ok(Extraction { output, usage }),
                Err(AttemptError::Fatal(reason)) => {
                    return Err(AgentError::UnexpectedModelBehavior {
                        attempts: attempt,
                        reason,
                    });
                }
                Err(AttemptError::Retryable(reason)) if attempt >= max_attempts => {
                    return Err(AgentError::UnexpectedModelBehavior {
                        attempts: attempt,
                        reason,
                    });
                }
                Err(AttemptError::Retryable(reason)) => {
                    warn!(
                        "Model attempt {}/{} failed: {}. Retrying",
                        attempt, max_attempts, reason
                    );
                    tokio::time::sleep(RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
            }
        }
    }
}
