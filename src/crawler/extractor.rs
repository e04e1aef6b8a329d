//! History extraction from a record's detail view
//!
//! The detail view nests two frames: the document tree, which holds the
//! "Consultar Andamento" trigger, and the content frame the history table is
//! rendered into. The extractor walks that path, reads the table markup and
//! hands it to the parser.

use crate::browser::{wait_for, Browser};
use crate::config::{BrowserConfig, Config, CrawlConfig};
use crate::crawler::parser::parse_history_row;
use crate::crawler::selectors::{CONTENT_FRAME, HISTORY_TABLE, PROGRESS_TRIGGER, TREE_FRAME};
use crate::ExtractError;
use std::time::Duration;

/// Result of reading one record's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// Cells of the history table's second body row
    Row(Vec<String>),
    /// The content frame carried no history table
    NoHistory,
    /// Extraction failed; the message has already been logged
    Failed(String),
}

impl HistoryOutcome {
    /// Cells to persist; empty unless a row was read
    pub fn into_cells(self) -> Vec<String> {
        match self {
            Self::Row(cells) => cells,
            Self::NoHistory | Self::Failed(_) => Vec::new(),
        }
    }
}

/// Reads the history row of the record currently displayed
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    frame_timeout: Duration,
    settle_delay: Duration,
    poll_interval: Duration,
}

impl RecordExtractor {
    pub fn new(frame_timeout: Duration, settle_delay: Duration, poll_interval: Duration) -> Self {
        Self {
            frame_timeout,
            settle_delay,
            poll_interval,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_settings(&config.crawl, &config.browser)
    }

    pub fn from_settings(crawl: &CrawlConfig, browser: &BrowserConfig) -> Self {
        Self::new(
            crawl.frame_timeout(),
            crawl.settle_delay(),
            browser.poll_interval(),
        )
    }

    /// Extracts the history row, never failing
    ///
    /// Errors are logged against `record_url` and reported as
    /// [`HistoryOutcome::Failed`]. The browser is returned to the top document
    /// whatever the outcome.
    pub async fn extract<B: Browser + ?Sized>(&self, browser: &B, record_url: &str) -> HistoryOutcome {
        let outcome = match self.try_extract(browser).await {
            Ok(Some(cells)) => HistoryOutcome::Row(cells),
            Ok(None) => {
                tracing::info!("No history table for {}", record_url);
                HistoryOutcome::NoHistory
            }
            Err(e @ ExtractError::MissingRow) => {
                tracing::error!("Unexpected history layout at {}: {}", record_url, e);
                HistoryOutcome::Failed(e.to_string())
            }
            Err(e) => {
                tracing::error!("History extraction failed for {}: {}", record_url, e);
                HistoryOutcome::Failed(e.to_string())
            }
        };

        if let Err(e) = browser.leave_frames().await {
            tracing::warn!("Could not return to top document after {}: {}", record_url, e);
        }

        outcome
    }

    async fn try_extract<B: Browser + ?Sized>(&self, browser: &B) -> Result<Option<Vec<String>>, ExtractError> {
        self.require(browser, TREE_FRAME).await?;
        browser.enter_frame(TREE_FRAME).await?;

        self.require(browser, PROGRESS_TRIGGER).await?;
        browser.click(PROGRESS_TRIGGER).await?;
        browser.leave_frames().await?;

        tokio::time::sleep(self.settle_delay).await;

        self.require(browser, CONTENT_FRAME).await?;
        browser.enter_frame(CONTENT_FRAME).await?;

        let Some(table_html) = browser.outer_html(HISTORY_TABLE).await? else {
            return Ok(None);
        };

        parse_history_row(&table_html).map(Some)
    }

    async fn require<B: Browser + ?Sized>(&self, browser: &B, selector: &str) -> Result<(), ExtractError> {
        if wait_for(browser, selector, self.frame_timeout, self.poll_interval).await? {
            Ok(())
        } else {
            Err(ExtractError::Timeout {
                selector: selector.to_string(),
                timeout_ms: self.frame_timeout.as_millis() as u64,
            })
        }
    }
}
