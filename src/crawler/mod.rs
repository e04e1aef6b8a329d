//! Crawler module for the SEI portal
//!
//! This module contains the core harvesting logic, including:
//! - Login and session reuse
//! - Unit enumeration with the skip rule
//! - Record list pagination
//! - Record navigation with bounded retry
//! - History extraction from nested frames
//! - Overall run orchestration

mod auth;
mod extractor;
mod orchestrator;
mod pagination;
mod parser;
mod retry;
pub mod selectors;
mod units;

pub use auth::authenticate;
pub use extractor::{HistoryOutcome, RecordExtractor};
pub use orchestrator::{Orchestrator, RunSummary};
pub use pagination::{PageSettings, PaginationCrawler, UnitReport};
pub use parser::{
    parse_history_row, parse_record_links, parse_tooltip, parse_unit_options, RecordLink,
    UnitOption,
};
pub use retry::{RetryError, RetryPolicy};
pub use units::{Unit, UnitEntry, UnitIterator, SKIPPED_UNIT_ORDINAL};

use crate::browser::WebDriverBrowser;
use crate::config::Config;
use crate::session::{FileKvStore, SessionStore};
use crate::storage::open_storage;
use crate::Result;
use std::path::Path;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Open the session store and the record database
/// 2. Start a WebDriver browser session
/// 3. Log in (or reuse the saved session) and crawl every unit
/// 4. Close the browser and the session store
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(RunSummary)` - Harvest completed
/// * `Err(HarvestError)` - Setup failed or the portal never became usable
pub async fn harvest(config: Config) -> Result<RunSummary> {
    let kv = FileKvStore::open(Path::new(&config.output.cookie_dir))?;
    let sessions = SessionStore::new(kv);
    let storage = open_storage(
        Path::new(&config.output.database_path),
        config.output.commit_mode,
    )?;
    let browser = WebDriverBrowser::connect(&config.browser).await?;

    let mut orchestrator = Orchestrator::new(config, browser, storage, sessions);
    let result = orchestrator.run().await;
    orchestrator.shutdown();

    result
}
