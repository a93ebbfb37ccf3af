use tracing::{info, warn};

use crate::error::{FetchError, PipelineError};
use crate::export::{CsvExporter, ExportReport};
use crate::scraper::{FetchedPage, PageFetcher, TextNormalizer};
use crate::traits::ProductExtractor;
use crate::validator::parse_results;

/// Extra attempts for the fetch-and-normalize step.
const PAGE_TEXT_RETRIES: u32 = 1;

/// Fetch -> normalize -> extract -> validate -> export, once per call.
pub struct Pipeline<E> {
    fetcher: PageFetcher,
    normalizer: TextNormalizer,
    extractor: E,
    exporter: CsvExporter,
}

impl<E: ProductExtractor> Pipeline<E> {
    pub fn new(
        fetcher: PageFetcher,
        normalizer: TextNormalizer,
        extractor: E,
        exporter: CsvExporter,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            extractor,
            exporter,
        }
    }

    /// Text handed to the extractor: the normalized page, or the sentinel
    /// when the server did not answer 200.
    pub async fn fetch_page_text(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.try_fetch_page_text(url).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < PAGE_TEXT_RETRIES => {
                    warn!("Fetching page text failed: {}. Retrying", e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_fetch_page_text(&self, url: &str) -> Result<String, FetchError> {
        match self.fetcher.fetch(url).await? {
            FetchedPage::Html(html) => self.normalizer.normalize(&html).await,
            // Passed on as content; the extractor decides what to make of it.
            FetchedPage::Unavailable { status, sentinel } => {
                warn!("{} answered {}, passing sentinel to the extractor", url, status);
                Ok(sentinel)
            }
        }
    }

    pub async fn run(&self, url: &str) -> Result<ExportReport, PipelineError> {
        let page_text = self.fetch_page_text(url).await?;
        let extraction = self.extractor.extract(url, &page_text).await?;
        let results = parse_results(&extraction.output)?;
        let report = self.exporter.export(&results, extraction.usage)?;

        info!("Run finished: {} records written", report.records);
        Ok(report)
    }
}
