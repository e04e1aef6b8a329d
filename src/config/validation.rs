use crate::config::types::{
    BrowserConfig, Config, CrawlConfig, CredentialsConfig, OutputConfig, PortalConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_portal_config(&config.portal)?;
    validate_credentials(&config.credentials)?;
    validate_browser_config(&config.browser)?;
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates portal configuration
fn validate_portal_config(config: &PortalConfig) -> Result<(), ConfigError> {
    validate_http_url("entry-url", &config.entry_url)?;

    if config.organization.trim().is_empty() {
        return Err(ConfigError::Validation(
            "organization cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates credentials: a username and exactly one password source
fn validate_credentials(config: &CredentialsConfig) -> Result<(), ConfigError> {
    if config.username.trim().is_empty() {
        return Err(ConfigError::Validation(
            "username cannot be empty".to_string(),
        ));
    }

    match (&config.password, &config.password_env) {
        (Some(_), Some(_)) => Err(ConfigError::Validation(
            "password and password-env are mutually exclusive".to_string(),
        )),
        (None, None) => Err(ConfigError::Validation(
            "either password or password-env must be set".to_string(),
        )),
        (None, Some(var)) if var.trim().is_empty() => Err(ConfigError::Validation(
            "password-env cannot be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Validates WebDriver settings
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    validate_http_url("webdriver-url", &config.webdriver_url)?;

    if config.page_load_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "page-load-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.poll_interval_ms == 0 || config.poll_interval_ms > 5_000 {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be between 1 and 5000, got {}",
            config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates crawl timings
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("landing-timeout-ms", config.landing_timeout_ms),
        ("list-timeout-ms", config.list_timeout_ms),
        ("frame-timeout-ms", config.frame_timeout_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    if config.max_pages_per_unit < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages-per-unit must be >= 1, got {}",
            config.max_pages_per_unit
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.cookie_dir.is_empty() {
        return Err(ConfigError::Validation(
            "cookie-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Parses a URL and requires an http(s) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}
