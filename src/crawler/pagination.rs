//! Paginated record-list crawling for one unit
//!
//! A unit's record list is walked page by page through the [`ListState`]
//! cycle. Opening a record navigates away from the list, so before looking for
//! the next page the crawler re-opens the unit's first list page and clicks
//! "next" until it is back where it was.

use crate::browser::{wait_for, Browser, BrowserError};
use crate::config::Config;
use crate::crawler::extractor::RecordExtractor;
use crate::crawler::parser::{parse_record_links, parse_tooltip, RecordLink};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::selectors::{NEXT_PAGE, RECORD_LIST_TABLE};
use crate::crawler::units::Unit;
use crate::output::print_record;
use crate::state::ListState;
use crate::storage::{ProcessRecord, RecordStore};
use crate::{HarvestError, Result};
use std::time::Duration;
use url::Url;

/// Timing and limits for list pages
#[derive(Debug, Clone, Copy)]
pub struct PageSettings {
    pub list_timeout: Duration,
    pub poll_interval: Duration,
    pub max_pages: u32,
    pub print_records: bool,
}

impl PageSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            list_timeout: config.crawl.list_timeout(),
            poll_interval: config.browser.poll_interval(),
            max_pages: config.crawl.max_pages_per_unit,
            print_records: config.output.print_records,
        }
    }
}

/// Counters for one unit's crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitReport {
    /// List pages loaded
    pub pages: u32,
    /// Records persisted
    pub committed: u64,
    /// Records whose page never loaded
    pub skipped: u64,
    /// Records lost to storage errors
    pub commit_failures: u64,
}

/// Walks one unit's record list and commits every record on it
pub struct PaginationCrawler<'a, B: Browser + ?Sized, S: RecordStore + ?Sized> {
    browser: &'a B,
    store: &'a mut S,
    extractor: &'a RecordExtractor,
    retry: RetryPolicy,
    settings: PageSettings,
}

impl<'a, B: Browser + ?Sized, S: RecordStore + ?Sized> PaginationCrawler<'a, B, S> {
    pub fn new(
        browser: &'a B,
        store: &'a mut S,
        extractor: &'a RecordExtractor,
        retry: RetryPolicy,
        settings: PageSettings,
    ) -> Self {
        Self {
            browser,
            store,
            extractor,
            retry,
            settings,
        }
    }

    /// Crawls every page of `unit`'s record list
    ///
    /// The unit must already be selected with its list displayed. Per-record
    /// failures are logged and counted; only an invalid state transition is
    /// returned as an error.
    pub async fn crawl(&mut self, unit: &Unit) -> Result<UnitReport> {
        let mut report = UnitReport::default();
        let mut state = ListState::ListLoaded;
        let mut page_index: u32 = 0;
        let mut list_url: Option<String> = None;
        let mut links: Vec<RecordLink> = Vec::new();

        while !state.is_terminal() {
            let next = match state {
                ListState::ListLoaded => {
                    match self.load_page().await {
                        Ok((url, page_links)) => {
                            report.pages += 1;
                            tracing::info!(
                                "Unit {} page {}: {} records",
                                unit,
                                page_index + 1,
                                page_links.len()
                            );
                            list_url.get_or_insert(url);
                            links = page_links;
                            ListState::RowsExtracted
                        }
                        Err(e) => {
                            tracing::error!(
                                "Could not read page {} of unit {}: {}",
                                page_index + 1,
                                unit,
                                e
                            );
                            ListState::Done
                        }
                    }
                }
                ListState::RowsExtracted => {
                    if links.is_empty() {
                        tracing::info!("No record links on page {} of unit {}", page_index + 1, unit);
                        ListState::Done
                    } else {
                        for link in std::mem::take(&mut links) {
                            self.process_record(unit, &link, &mut report).await;
                        }
                        ListState::Paginating
                    }
                }
                ListState::Paginating => {
                    let Some(url) = list_url.as_deref() else {
                        return Err(HarvestError::InvalidTransition {
                            from: state,
                            to: ListState::ListLoaded,
                        });
                    };

                    if page_index + 1 >= self.settings.max_pages {
                        tracing::warn!(
                            "Unit {} reached the limit of {} pages, stopping",
                            unit,
                            self.settings.max_pages
                        );
                        ListState::Done
                    } else {
                        match self.next_page(url, page_index).await {
                            Ok(true) => {
                                page_index += 1;
                                ListState::ListLoaded
                            }
                            Ok(false) => ListState::Done,
                            Err(e) => {
                                tracing::error!(
                                    "Could not return to page {} of unit {} at {}: {}",
                                    page_index + 1,
                                    unit,
                                    url,
                                    e
                                );
                                ListState::Done
                            }
                        }
                    }
                }
                ListState::Done => break,
            };

            if !state.can_transition_to(next) {
                return Err(HarvestError::InvalidTransition {
                    from: state,
                    to: next,
                });
            }
            tracing::debug!("Unit {}: {} -> {}", unit, state, next);
            state = next;
        }

        tracing::info!(
            "Unit {} done: {} pages, {} committed, {} skipped, {} commit failures",
            unit,
            report.pages,
            report.committed,
            report.skipped,
            report.commit_failures
        );

        Ok(report)
    }

    /// Reads the record links of the displayed list page
    ///
    /// # Returns
    ///
    /// The page URL and its links; no links if the table did not appear.
    async fn load_page(&self) -> Result<(String, Vec<RecordLink>)> {
        let url = self.browser.current_url().await?;

        let present = wait_for(
            self.browser,
            RECORD_LIST_TABLE,
            self.settings.list_timeout,
            self.settings.poll_interval,
        )
        .await?;
        if !present {
            return Ok((url, Vec::new()));
        }

        let Some(table_html) = self.browser.outer_html(RECORD_LIST_TABLE).await? else {
            return Ok((url, Vec::new()));
        };

        let base = Url::parse(&url).map_err(BrowserError::from)?;
        let links = parse_record_links(&table_html, &base)?;

        Ok((url, links))
    }

    /// Opens, extracts and commits one record
    async fn process_record(&mut self, unit: &Unit, link: &RecordLink, report: &mut UnitReport) {
        let browser = self.browser;
        let target = link.target_url.as_str();
        let what = format!("Loading record {} of unit {} ({})", link.label, unit, target);

        if let Err(e) = self.retry.run(&what, |_| browser.goto(target)).await {
            tracing::error!(
                "Skipping record {} of unit {} at {} after {} attempts: {}",
                link.label,
                unit,
                target,
                e.attempts,
                e.last_error
            );
            report.skipped += 1;
            return;
        }

        let cells = self.extractor.extract(browser, target).await.into_cells();
        let description = parse_tooltip(&link.tooltip_raw);
        let record = ProcessRecord::from_parts(&link.label, &description, &cells);

        if self.settings.print_records {
            print_record(&record);
        }

        match self.store.commit(&record) {
            Ok(()) => report.committed += 1,
            Err(e) => {
                tracing::error!(
                    "Failed to store record {} of unit {}: {}",
                    record.name,
                    unit,
                    e
                );
                report.commit_failures += 1;
            }
        }
    }

    /// Restores the list at `page_index` and moves to the following page
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The next page is displayed
    /// * `Ok(false)` - There is no next page
    async fn next_page(&self, list_url: &str, page_index: u32) -> Result<bool> {
        let browser = self.browser;

        self.retry
            .run("Reloading record list", |_| browser.goto(list_url))
            .await
            .map_err(|e| HarvestError::Browser(e.last_error))?;

        for _ in 0..page_index {
            if !self.wait_for_list().await? {
                return Ok(false);
            }
            browser.click(NEXT_PAGE).await?;
        }

        if !self.wait_for_list().await? {
            tracing::warn!("Record list missing after reload of {}", list_url);
            return Ok(false);
        }

        if !browser.is_visible(NEXT_PAGE).await? {
            return Ok(false);
        }

        browser.click(NEXT_PAGE).await?;
        Ok(true)
    }

    async fn wait_for_list(&self) -> Result<bool> {
        Ok(wait_for(
            self.browser,
            RECORD_LIST_TABLE,
            self.settings.list_timeout,
            self.settings.poll_interval,
        )
        .await?)
    }
}
