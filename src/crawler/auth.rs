//! Login gate for the portal entry page

use crate::browser::{Browser, OptionChoice};
use crate::config::{CredentialsConfig, PortalConfig};
use crate::crawler::selectors::{LOGIN_SUBMIT, ORGANIZATION_SELECT, PASSWORD_INPUT, USERNAME_INPUT};
use crate::Result;

/// Submits the login form if the entry page shows one
///
/// # Returns
///
/// * `Ok(true)` - The form was present and has been submitted
/// * `Ok(false)` - No login form; the restored session is assumed valid
/// * `Err(HarvestError)` - A form field was missing or the password could not
///   be resolved
pub async fn authenticate<B: Browser + ?Sized>(
    browser: &B,
    portal: &PortalConfig,
    credentials: &CredentialsConfig,
) -> Result<bool> {
    if !browser.is_visible(LOGIN_SUBMIT).await? {
        tracing::info!("No login form, reusing saved session");
        return Ok(false);
    }

    tracing::info!(
        "Logging in as {} ({})",
        credentials.username,
        portal.organization
    );

    let password = credentials.resolve_password()?;

    browser.fill(USERNAME_INPUT, &credentials.username).await?;
    browser.fill(PASSWORD_INPUT, &password).await?;
    browser
        .select_option(ORGANIZATION_SELECT, OptionChoice::Label(&portal.organization))
        .await?;
    browser.click(LOGIN_SUBMIT).await?;

    Ok(true)
}
