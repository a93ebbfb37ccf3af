pub mod agent;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod scraper;
pub mod traits;
pub mod validator;

pub use pipeline::Pipeline;
