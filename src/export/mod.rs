//! Timestamped CSV export of a validated result set

use std::path::PathBuf;

use chrono::{DateTime, Local};
use csv::WriterBuilder;
use tracing::info;

use crate::error::ExportError;
use crate::models::{ResultSet, Usage};

pub const CSV_HEADER: [&str; 4] = ["brand_name", "product_name", "price", "rating_count"];

const FILE_PREFIX: &str = "web_scraping_results_";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// What an export wrote
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub records: usize,
    pub usage: Usage,
}

#[derive(Debug)]
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// File name for a run finished at `timestamp`, second precision.
    pub fn file_name(timestamp: DateTime<Local>) -> String {
        format!("{FILE_PREFIX}{}.csv", timestamp.format(TIMESTAMP_FORMAT))
    }

    pub fn export(&self, results: &ResultSet, usage: Usage) -> Result<ExportReport, ExportError> {
        self.export_at(results, usage, Local::now())
    }

    pub fn export_at(
        &self,
        results: &ResultSet,
        usage: Usage,
        timestamp: DateTime<Local>,
    ) -> Result<ExportReport, ExportError> {
        info!("{}", "=".repeat(50));
        info!("Input_tokens: {}", usage.input_tokens);
        info!("Output_tokens: {}", usage.output_tokens);
        info!("Total_tokens: {}", usage.total_tokens);

        let path = self.output_dir.join(Self::file_name(timestamp));
        let csv_error = |source| ExportError::Csv {
            path: path.clone(),
            source,
        };

        // Header is written by hand so an empty result set still gets one.
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(csv_error)?;
        writer.write_record(CSV_HEADER).map_err(csv_error)?;

        for product in &results.dataset {
            writer.serialize(product).map_err(csv_error)?;
        }

        writer.flush().map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Results saved to {}", path.display());
        info!("Successfully extracted {} products!", results.len());

        Ok(ExportReport {
            path,
            records: results.len(),
            usage,
        })
    }
}
