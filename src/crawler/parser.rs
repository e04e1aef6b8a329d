//! HTML parsing for portal markup
//!
//! The crawler pulls raw markup out of the browser and reads it here with
//! `scraper`, against fixed selector paths:
//! - Unit options of the unit dropdown
//! - Record links of a list page (third cell's anchor)
//! - The wanted row of a record's history table
//! - Tooltip text embedded in a link's `onmouseover` handler

use crate::crawler::selectors::{
    HISTORY_ROW, RECORD_LINK_CELL, RECORD_LIST_CELLS, RECORD_LIST_ROWS,
};
use crate::ExtractError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// One option of the unit dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOption {
    /// The option's `value` attribute (its text if the attribute is absent)
    pub value: String,
    /// Trimmed visible text
    pub label: String,
}

/// One row of a unit's record list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLink {
    /// Absolute URL of the record's detail view
    pub target_url: String,
    /// Trimmed link text (the process number)
    pub label: String,
    /// Raw `onmouseover` attribute, empty if missing
    pub tooltip_raw: String,
}

/// Parses a selector, reporting failures as extraction errors
fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

fn trimmed_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Reads the options of a `<select>` element's outer HTML, in document order
pub fn parse_unit_options(select_html: &str) -> Result<Vec<UnitOption>, ExtractError> {
    let fragment = Html::parse_fragment(select_html);
    let option_selector = selector("option")?;

    Ok(fragment
        .select(&option_selector)
        .map(|option| {
            let label = trimmed_text(&option);
            let value = option
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| label.clone());
            UnitOption { value, label }
        })
        .collect())
}

/// Extracts record links from the record list table's outer HTML
///
/// # Link Extraction Rules
///
/// - Rows are read in document order
/// - Only the third cell's first `<a>` is considered
/// - Rows without that anchor, or whose `href` is empty or does not resolve
///   against `base_url`, are discarded
///
/// # Arguments
///
/// * `table_html` - Outer HTML of the list table
/// * `base_url` - URL of the list page, used to resolve relative links
pub fn parse_record_links(table_html: &str, base_url: &Url) -> Result<Vec<RecordLink>, ExtractError> {
    let fragment = Html::parse_fragment(table_html);
    let row_selector = selector(RECORD_LIST_ROWS)?;
    let cell_selector = selector(RECORD_LIST_CELLS)?;
    let anchor_selector = selector("a")?;

    let mut links = Vec::new();

    for row in fragment.select(&row_selector) {
        let Some(cell) = row.select(&cell_selector).nth(RECORD_LINK_CELL) else {
            continue;
        };
        let Some(anchor) = cell.select(&anchor_selector).next() else {
            continue;
        };

        let href = anchor.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            continue;
        }

        let target_url = match base_url.join(href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!("Skipping unresolvable record link {}: {}", href, e);
                continue;
            }
        };

        links.push(RecordLink {
            target_url,
            label: trimmed_text(&anchor),
            tooltip_raw: anchor.value().attr("onmouseover").unwrap_or("").to_string(),
        });
    }

    Ok(links)
}

/// Extracts the trimmed cell texts of the history table's second body row
///
/// The first row carries column headers, so the second row is the most
/// recent history entry.
pub fn parse_history_row(table_html: &str) -> Result<Vec<String>, ExtractError> {
    let fragment = Html::parse_fragment(table_html);
    let row_selector = selector(HISTORY_ROW)?;
    let cell_selector = selector("td")?;

    let row = fragment
        .select(&row_selector)
        .next()
        .ok_or(ExtractError::MissingRow)?;

    Ok(row
        .select(&cell_selector)
        .map(|cell| trimmed_text(&cell))
        .collect())
}

fn tooltip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"'([^']*)'|(\w+[^,]*)$").expect("tooltip pattern is a valid regex")
    })
}

/// Extracts the tooltip text from a raw `onmouseover` handler
///
/// The handler is scanned for single-quoted strings or a trailing run of
/// words; the last match wins, with quotes stripped and whitespace trimmed.
/// Returns an empty string when nothing matches.
///
/// # Example
///
/// ```
/// use sei_harvester::crawler::parse_tooltip;
///
/// let raw = "return infraTooltipMostrar('Pedido de diárias','Requerimento');";
/// assert_eq!(parse_tooltip(raw), "Requerimento");
/// ```
pub fn parse_tooltip(raw: &str) -> String {
    tooltip_pattern()
        .find_iter(raw)
        .last()
        .map(|m| m.as_str().replace('\'', "").trim().to_string())
        .unwrap_or_default()
}
