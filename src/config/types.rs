use crate::storage::CommitMode;
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Login entry point of the SEI instance the harvester was written for
pub const DEFAULT_ENTRY_URL: &str =
    "https://sip.pi.gov.br/sip/login.php?sigla_orgao_sistema=GOV-PI&sigla_sistema=SEI&infra_url=L3NlaS8=";

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub portal: PortalConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Portal location and tenant selection
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Login page URL, including organization/system query parameters
    #[serde(rename = "entry-url", default = "default_entry_url")]
    pub entry_url: String,

    /// Visible label of the organization to pick on the login form
    pub organization: String,
}

/// Login credentials
///
/// The password is either inlined or read from an environment variable at
/// login time; exactly one of the two must be present.
#[derive(Clone, Deserialize)]
pub struct CredentialsConfig {
    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Name of the environment variable holding the password
    #[serde(rename = "password-env", default)]
    pub password_env: Option<String>,
}

impl CredentialsConfig {
    /// Returns the password, reading the environment if configured that way
    pub fn resolve_password(&self) -> ConfigResult<String> {
        if let Some(password) = &self.password {
            return Ok(password.clone());
        }

        match &self.password_env {
            Some(var) => std::env::var(var).map_err(|_| ConfigError::MissingEnv(var.clone())),
            None => Err(ConfigError::Validation(
                "either password or password-env must be set".to_string(),
            )),
        }
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

/// WebDriver connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Base URL of a running chromedriver/geckodriver
    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(rename = "accept-insecure-certs", default)]
    pub accept_insecure_certs: bool,

    /// Page load timeout enforced by the browser (milliseconds)
    #[serde(rename = "page-load-timeout-ms", default = "default_page_load_timeout")]
    pub page_load_timeout_ms: u64,

    /// Interval between element lookups while waiting (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            accept_insecure_certs: false,
            page_load_timeout_ms: default_page_load_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl BrowserConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Crawl timing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// How long to wait for the unit selector after loading the portal
    #[serde(rename = "landing-timeout-ms", default = "default_landing_timeout")]
    pub landing_timeout_ms: u64,

    /// How long to wait for a unit's record list to appear
    #[serde(rename = "list-timeout-ms", default = "default_short_timeout")]
    pub list_timeout_ms: u64,

    /// How long to wait for each frame of the record view
    #[serde(rename = "frame-timeout-ms", default = "default_short_timeout")]
    pub frame_timeout_ms: u64,

    /// Fixed pause after requesting the progress view
    #[serde(rename = "settle-delay-ms", default = "default_short_timeout")]
    pub settle_delay_ms: u64,

    /// Upper bound on list pages visited per unit
    #[serde(rename = "max-pages-per-unit", default = "default_max_pages")]
    pub max_pages_per_unit: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            landing_timeout_ms: default_landing_timeout(),
            list_timeout_ms: default_short_timeout(),
            frame_timeout_ms: default_short_timeout(),
            settle_delay_ms: default_short_timeout(),
            max_pages_per_unit: default_max_pages(),
        }
    }
}

impl CrawlConfig {
    pub fn landing_timeout(&self) -> Duration {
        Duration::from_millis(self.landing_timeout_ms)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_millis(self.list_timeout_ms)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Directory holding the saved browser session
    #[serde(rename = "cookie-dir", default = "default_cookie_dir")]
    pub cookie_dir: String,

    #[serde(rename = "commit-mode", default)]
    pub commit_mode: CommitMode,

    /// Dump every extracted record to stdout as a table
    #[serde(rename = "print-records", default = "default_true")]
    pub print_records: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            cookie_dir: default_cookie_dir(),
            commit_mode: CommitMode::default(),
            print_records: true,
        }
    }
}

fn default_entry_url() -> String {
    DEFAULT_ENTRY_URL.to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_true() -> bool {
    true
}

fn default_page_load_timeout() -> u64 {
    30_000
}

fn default_poll_interval() -> u64 {
    100
}

fn default_landing_timeout() -> u64 {
    5_000
}

fn default_short_timeout() -> u64 {
    2_000
}

fn default_max_pages() -> u32 {
    500
}

fn default_database_path() -> String {
    "processos.db".to_string()
}

fn default_cookie_dir() -> String {
    "cookie_storage".to_string()
}
