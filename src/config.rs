//! Model endpoint configuration and command-line options

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::scraper::DEFAULT_DEBUG_FILE;

pub const DEFAULT_URL: &str = "https://www.ikea.com/in/en/cat/beds-bm003/";

/// Connection and sampling settings for the extraction model.
///
/// Built explicitly and handed to the agent, so tests can point one at a
/// local stub without touching the process environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL of the deployment, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    /// Deployment (model) name
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Extra attempts after the first failed model request
    pub max_retries: u32,
    pub request_timeout: Duration,
}

impl AgentConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: api_version.into(),
            model: model.into(),
            max_tokens: 8000,
            temperature: 0.1,
            max_retries: 2,
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Reads `OPENAI_ENDPOINT`, `OPENAI_API_KEY`, `API_VERSION` and
    /// `OPENAI_MODEL`. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(
            required_var("OPENAI_ENDPOINT")?,
            required_var("OPENAI_API_KEY")?,
            required_var("API_VERSION")?,
            required_var("OPENAI_MODEL")?,
        ))
    }

    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            self.api_version
        )
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

/// Extract product listings from an e-commerce category page into CSV
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Listing page to extract
    #[arg(long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Directory receiving the timestamped CSV
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// File receiving the stripped page text, overwritten on every run
    #[arg(long, default_value = DEFAULT_DEBUG_FILE)]
    pub debug_file: PathBuf,
}
