//! Top-level crawl orchestration
//!
//! One run goes through these phases, in order:
//! - Clear the main table
//! - Load the portal entry page and re-apply any saved session cookies
//! - Log in if the portal asks for it
//! - Confirm the landing page (the unit selector); failure here is fatal
//! - Save the session after a fresh login
//! - Crawl every unit's record list, page by page
//! - Promote staged rows and close the browser

use crate::browser::{wait_for, Browser};
use crate::config::Config;
use crate::crawler::auth::authenticate;
use crate::crawler::extractor::RecordExtractor;
use crate::crawler::pagination::{PageSettings, PaginationCrawler, UnitReport};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::selectors::UNIT_SELECT;
use crate::crawler::units::{UnitEntry, UnitIterator};
use crate::session::{Session, SessionStore};
use crate::storage::RecordStore;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};

/// Totals of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Whether the run had to log in rather than reuse a saved session
    pub logged_in: bool,
    /// Units offered by the unit dropdown
    pub units_total: usize,
    /// Units whose record list was crawled
    pub units_crawled: usize,
    /// Units with no record list
    pub units_empty: usize,
    /// Units excluded by the skip rule or that could not be selected
    pub units_skipped: usize,
    pub pages: u64,
    pub records_committed: u64,
    pub records_skipped: u64,
    pub commit_failures: u64,
    /// Rows in the main table once the run finished
    pub rows_stored: u64,
}

impl RunSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            logged_in: false,
            units_total: 0,
            units_crawled: 0,
            units_empty: 0,
            units_skipped: 0,
            pages: 0,
            records_committed: 0,
            records_skipped: 0,
            commit_failures: 0,
            rows_stored: 0,
        }
    }

    fn add_unit(&mut self, report: &UnitReport) {
        self.units_crawled += 1;
        self.pages += u64::from(report.pages);
        self.records_committed += report.committed;
        self.records_skipped += report.skipped;
        self.commit_failures += report.commit_failures;
    }

    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Drives a complete run against one browser and one record store
pub struct Orchestrator<B: Browser, S: RecordStore> {
    config: Config,
    browser: B,
    storage: S,
    sessions: SessionStore,
    retry: RetryPolicy,
}

impl<B: Browser, S: RecordStore> Orchestrator<B, S> {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - Validated harvester configuration
    /// * `browser` - A browser session, not yet navigated
    /// * `storage` - The record store the run writes to
    /// * `sessions` - Saved session cookies
    pub fn new(config: Config, browser: B, storage: S, sessions: SessionStore) -> Self {
        Self {
            config,
            browser,
            storage,
            sessions,
            retry: RetryPolicy::navigation(),
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Runs one complete crawl
    ///
    /// The browser is closed when this returns, whether or not the run
    /// succeeded.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run reached the end of the unit list
    /// * `Err(HarvestError::PortalUnavailable)` - The entry page never loaded
    /// * `Err(HarvestError::LandingTimeout)` - The unit selector never appeared
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::new(Utc::now());
        tracing::info!("Starting harvest of {}", self.config.portal.entry_url);

        if let Err(e) = self.storage.clear() {
            tracing::error!("Failed to clear stored records: {}", e);
        }

        if let Err(e) = self.open_portal().await {
            self.close_browser().await;
            return Err(e);
        }

        summary.logged_in = match authenticate(
            &self.browser,
            &self.config.portal,
            &self.config.credentials,
        )
        .await
        {
            Ok(logged_in) => logged_in,
            Err(e) => {
                tracing::error!("Login failed: {}", e);
                false
            }
        };

        if let Err(e) = self.confirm_landing().await {
            self.close_browser().await;
            return Err(e);
        }

        if summary.logged_in {
            self.save_session().await;
        }

        self.crawl_units(&mut summary).await;

        match self.storage.finish() {
            Ok(0) => {}
            Ok(promoted) => tracing::info!("Promoted {} staged records", promoted),
            Err(e) => tracing::error!("Failed to promote staged records: {}", e),
        }

        self.close_browser().await;

        summary.rows_stored = self.storage.count().unwrap_or_else(|e| {
            tracing::error!("Failed to count stored records: {}", e);
            0
        });
        summary.finished_at = Utc::now();

        tracing::info!(
            "Harvest completed: {} records from {} units in {}s",
            summary.records_committed,
            summary.units_crawled,
            summary.elapsed().num_seconds()
        );

        Ok(summary)
    }

    /// Closes the session store, handing back the browser and the record store
    pub fn shutdown(self) -> (B, S) {
        self.sessions.close();
        (self.browser, self.storage)
    }

    /// Loads the entry page, re-applying saved cookies if there are any
    ///
    /// Cookies can only be attached to a loaded document, so the entry page is
    /// loaded a second time once they are in place.
    async fn open_portal(&self) -> Result<()> {
        let entry_url = self.config.portal.entry_url.as_str();
        self.load_entry(entry_url).await?;

        let Some(session) = self.sessions.restore() else {
            return Ok(());
        };

        match self.browser.add_cookies(session.cookies()).await {
            Ok(()) => self.load_entry(entry_url).await,
            Err(e) => {
                tracing::warn!("Could not apply saved cookies: {}", e);
                Ok(())
            }
        }
    }

    async fn load_entry(&self, entry_url: &str) -> Result<()> {
        let browser = &self.browser;

        self.retry
            .run("Loading portal entry page", |_| browser.goto(entry_url))
            .await
            .map_err(|e| HarvestError::PortalUnavailable {
                url: entry_url.to_string(),
                attempts: e.attempts,
                message: e.last_error.to_string(),
            })
    }

    async fn confirm_landing(&self) -> Result<()> {
        let timeout = self.config.crawl.landing_timeout();
        let found = wait_for(
            &self.browser,
            UNIT_SELECT,
            timeout,
            self.config.browser.poll_interval(),
        )
        .await?;

        if found {
            tracing::info!("Landing page loaded");
            return Ok(());
        }

        let url = self
            .browser
            .current_url()
            .await
            .unwrap_or_else(|_| self.config.portal.entry_url.clone());
        tracing::error!("Unit selector {} did not appear at {}", UNIT_SELECT, url);

        Err(HarvestError::LandingTimeout {
            url,
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    async fn save_session(&self) {
        match self.browser.cookies().await {
            Ok(cookies) => {
                if let Err(e) = self.sessions.save(&Session::new(cookies)) {
                    tracing::error!("Failed to save session: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to read session cookies: {}", e),
        }
    }

    async fn crawl_units(&mut self, summary: &mut RunSummary) {
        let browser = &self.browser;
        let storage = &mut self.storage;
        let extractor = RecordExtractor::from_config(&self.config);
        let settings = PageSettings::from_config(&self.config);
        let units = UnitIterator::new(browser, settings.list_timeout, settings.poll_interval);

        let all_units = match units.enumerate().await {
            Ok(all_units) => all_units,
            Err(e) => {
                tracing::error!("Failed to read unit list: {}", e);
                return;
            }
        };
        summary.units_total = all_units.len();

        for unit in &all_units {
            if unit.should_skip() {
                tracing::info!("Skipping unit {}", unit);
                summary.units_skipped += 1;
                continue;
            }

            tracing::info!("Selecting unit {}", unit);

            match units.select(unit).await {
                UnitEntry::Ready => {}
                UnitEntry::Empty => {
                    summary.units_empty += 1;
                    continue;
                }
                UnitEntry::Failed => {
                    summary.units_skipped += 1;
                    continue;
                }
            }

            let mut crawler =
                PaginationCrawler::new(browser, &mut *storage, &extractor, self.retry, settings);

            match crawler.crawl(unit).await {
                Ok(report) => summary.add_unit(&report),
                Err(e) => tracing::error!("Crawl of unit {} aborted: {}", unit, e),
            }
        }
    }

    async fn close_browser(&self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
    }
}
