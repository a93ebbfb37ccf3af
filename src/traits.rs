//! Seam between the pipeline and the language model

use async_trait::async_trait;

use crate::error::AgentError;
use crate::models::Usage;

/// Raw model answer for one run plus the tokens it cost
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Free-form text that should be `{"dataset": [...]}` JSON
    pub output: String,
    pub usage: Usage,
}

/// Turns normalized page text into product JSON
#[async_trait]
pub trait ProductExtractor: Send + Sync {
    /// Ask the model for the products on a page.
    ///
    /// # Arguments
    /// * `url` - The page the text came from, included for the model's context
    /// * `page_text` - Normalized page text, or the fetch sentinel
    ///
    /// # Returns
    /// * `Result<Extraction, AgentError>` - The unvalidated answer, or
    ///   `UnexpectedModelBehavior` once retries are exhausted
    async fn extract(&self, url: &str, page_text: &str) -> Result<Extraction, AgentError>;
}
