//! SEI Harvester: a case-record crawler for the SEI government portal
//!
//! This crate logs into the portal (reusing a saved session when possible),
//! walks every organizational unit's inbound-record list page by page, opens
//! each record's history view and persists one row per record into SQLite.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod output;
pub mod session;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Session store error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Portal entry page {url} could not be loaded after {attempts} attempts: {message}")]
    PortalUnavailable {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Unit selector did not appear within {timeout_ms}ms at {url}")]
    LandingTimeout { url: String, timeout_ms: u64 },

    #[error("Invalid list state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::ListState,
        to: state::ListState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),
}

/// Errors raised while reading markup out of the portal
///
/// None of these abort a run: the crawler logs them and carries on with an
/// empty result for the affected record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Timed out after {timeout_ms}ms waiting for {selector}")]
    Timeout { selector: String, timeout_ms: u64 },

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("History table has no second body row")]
    MissingRow,

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use state::ListState;
pub use storage::{CommitMode, ProcessRecord};
