//! Data models for extracted products and chat-completions payloads

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product record extracted from a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub brand_name: String,
    pub product_name: String,
    #[serde(deserialize_with = "lax_price")]
    pub price: f64,
    #[serde(deserialize_with = "lax_rating_count")]
    pub rating_count: u64,
}

/// All products extracted in one run, in page order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub dataset: Vec<Product>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }
}

/// Token usage accumulated over the model requests of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn add(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Accepts a JSON number or a numeric string; rejects negatives.
fn lax_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let price = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|p| p.is_finite())
    .ok_or_else(|| D::Error::custom(format!("price is not a valid number: {value}")))?;

    if price < 0.0 {
        return Err(D::Error::custom(format!("price must be non-negative, got {price}")));
    }

    Ok(price)
}

/// Accepts an integer, an integral float, or an integer string; rejects negatives.
fn lax_rating_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let as_float = match &value {
        Value::Number(n) => {
            if let Some(count) = n.as_u64() {
                return Ok(count);
            }
            n.as_f64()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(count) = s.parse::<u64>() {
                return Ok(count);
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    };

    match as_float {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 => {
            Ok(f as u64)
        }
        Some(f) if f < 0.0 => Err(D::Error::custom(format!(
            "rating_count must be non-negative, got {value}"
        ))),
        _ => Err(D::Error::custom(format!(
            "rating_count is not a valid integer: {value}"
        ))),
    }
}

/// One message of a chat-completions conversation
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Chat-completions response body, reduced to the fields we read
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

/// Token counts as reported by the chat-completions API
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl From<ChatUsage> for Usage {
    fn from(usage: ChatUsage) -> Self {
        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}
