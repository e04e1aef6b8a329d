//! Organizational unit enumeration and selection

use crate::browser::{wait_for, Browser, OptionChoice};
use crate::crawler::parser::parse_unit_options;
use crate::crawler::selectors::{RECORD_LIST_TABLE, UNIT_SELECT};
use crate::Result;
use std::fmt;
use std::time::Duration;

/// 1-based position of the unit that is never crawled
pub const SKIPPED_UNIT_ORDINAL: usize = 48;

/// One option of the unit dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Value used to select the unit
    pub value: String,
    /// Visible label, for logging
    pub label: String,
    /// 1-based position in the dropdown
    pub ordinal: usize,
}

impl Unit {
    /// Returns true if the skip rule excludes this unit
    pub fn should_skip(&self) -> bool {
        self.ordinal == SKIPPED_UNIT_ORDINAL
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({})", self.ordinal, self.label, self.value)
    }
}

/// What selecting a unit left on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEntry {
    /// The record list is displayed
    Ready,
    /// No record list appeared within the list timeout
    Empty,
    /// The unit could not be selected
    Failed,
}

/// Enumerates and switches between organizational units
pub struct UnitIterator<'a, B: Browser + ?Sized> {
    browser: &'a B,
    list_timeout: Duration,
    poll_interval: Duration,
}

impl<'a, B: Browser + ?Sized> UnitIterator<'a, B> {
    pub fn new(browser: &'a B, list_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            browser,
            list_timeout,
            poll_interval,
        }
    }

    /// Reads every unit option once, in document order
    ///
    /// A missing dropdown yields no units.
    pub async fn enumerate(&self) -> Result<Vec<Unit>> {
        let Some(select_html) = self.browser.outer_html(UNIT_SELECT).await? else {
            tracing::warn!("Unit selector {} not found, no units to crawl", UNIT_SELECT);
            return Ok(Vec::new());
        };

        let units: Vec<Unit> = parse_unit_options(&select_html)?
            .into_iter()
            .enumerate()
            .map(|(index, option)| Unit {
                value: option.value,
                label: option.label,
                ordinal: index + 1,
            })
            .collect();

        tracing::info!("Found {} units", units.len());
        Ok(units)
    }

    /// Selects `unit` and waits for its record list
    ///
    /// Never selects a unit excluded by the skip rule.
    pub async fn select(&self, unit: &Unit) -> UnitEntry {
        if unit.should_skip() {
            tracing::info!("Skipping unit {}", unit);
            return UnitEntry::Failed;
        }

        if let Err(e) = self
            .browser
            .select_option(UNIT_SELECT, OptionChoice::Value(&unit.value))
            .await
        {
            tracing::error!("Could not select unit {}: {}", unit, e);
            return UnitEntry::Failed;
        }

        match wait_for(self.browser, RECORD_LIST_TABLE, self.list_timeout, self.poll_interval).await {
            Ok(true) => UnitEntry::Ready,
            Ok(false) => {
                tracing::info!("Unit {} has no record list", unit);
                UnitEntry::Empty
            }
            Err(e) => {
                tracing::error!("Waiting for the record list of unit {} failed: {}", unit, e);
                UnitEntry::Failed
            }
        }
    }
}
