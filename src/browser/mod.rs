//! Browser abstraction used by the crawler
//!
//! The crawler never talks to a browser engine directly. Everything it needs
//! (navigation, element lookup, clicks, frame switching, cookies) goes through
//! the [`Browser`] trait, addressed by CSS selectors relative to the current
//! browsing context. [`WebDriverBrowser`] implements it over the W3C WebDriver
//! protocol.

mod wait;
mod webdriver;

pub use wait::wait_for;
pub use webdriver::WebDriverBrowser;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while driving the browser
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("WebDriver transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WebDriver command '{command}' failed ({code}): {message}")]
    Command {
        command: String,
        code: String,
        message: String,
    },

    #[error("Element not found: {selector}")]
    NoSuchElement { selector: String },

    #[error("No option matching {choice} in {selector}")]
    NoSuchOption { selector: String, choice: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// A browser cookie, in WebDriver's JSON shape
///
/// The same shape is written to the session store, so a saved session can be
/// handed straight back to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiry as seconds since the Unix epoch; `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expiry: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }
}

/// How to pick an `<option>` inside a `<select>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionChoice<'a> {
    /// Match the option's `value` attribute
    Value(&'a str),
    /// Match the option's trimmed visible text
    Label(&'a str),
}

impl std::fmt::Display for OptionChoice<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "value '{}'", v),
            Self::Label(l) => write!(f, "label '{}'", l),
        }
    }
}

/// Operations the crawler needs from a browser engine
///
/// Selectors are CSS and resolve inside the current browsing context (the top
/// document, or the frame last entered with [`Browser::enter_frame`]).
/// Lookups that find nothing are reported as `Ok(false)` / `Ok(None)`, never
/// as errors; interactions on a missing element fail with
/// [`BrowserError::NoSuchElement`].
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigates the top-level context and waits for the page load
    async fn goto(&self, url: &str) -> BrowserResult<()>;

    /// Returns the URL of the top-level document
    async fn current_url(&self) -> BrowserResult<String>;

    /// Returns true if any element matches the selector
    async fn exists(&self, selector: &str) -> BrowserResult<bool>;

    /// Returns true if a matching element exists and is displayed
    async fn is_visible(&self, selector: &str) -> BrowserResult<bool>;

    /// Clicks the first matching element
    async fn click(&self, selector: &str) -> BrowserResult<()>;

    /// Replaces the value of a text input
    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()>;

    /// Selects an option of a `<select>` element
    async fn select_option(&self, selector: &str, choice: OptionChoice<'_>) -> BrowserResult<()>;

    /// Returns the outer HTML of the first matching element
    async fn outer_html(&self, selector: &str) -> BrowserResult<Option<String>>;

    /// Switches the browsing context into the matching frame
    async fn enter_frame(&self, selector: &str) -> BrowserResult<()>;

    /// Switches the browsing context back to the top document
    async fn leave_frames(&self) -> BrowserResult<()>;

    /// Returns every cookie visible to the current document
    async fn cookies(&self) -> BrowserResult<Vec<Cookie>>;

    /// Attaches cookies to the current document's domain
    ///
    /// Each cookie is applied on its own; a rejected cookie is logged and
    /// skipped. Fails only when every cookie was rejected.
    async fn add_cookies(&self, cookies: &[Cookie]) -> BrowserResult<()>;

    /// Ends the browser session
    async fn close(&self) -> BrowserResult<()>;
}
