//! W3C WebDriver client
//!
//! This module drives an externally started `chromedriver` or `geckodriver`
//! over its HTTP wire protocol:
//! - Session creation with headless capabilities and a page-load timeout
//! - CSS element lookup, clicks, typing and `<select>` handling
//! - Frame switching
//! - Cookie export/import for session reuse

use crate::browser::{Browser, BrowserError, BrowserResult, Cookie, OptionChoice};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;

/// Key under which WebDriver serializes element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver error code for failed element lookups
const NO_SUCH_ELEMENT: &str = "no such element";

/// A live WebDriver session
pub struct WebDriverBrowser {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverBrowser {
    /// Opens a new browser session on the configured WebDriver server
    ///
    /// # Arguments
    ///
    /// * `config` - WebDriver endpoint and browser options
    ///
    /// # Returns
    ///
    /// * `Ok(WebDriverBrowser)` - Session created and timeouts applied
    /// * `Err(BrowserError)` - Server unreachable or session refused
    pub async fn connect(config: &BrowserConfig) -> BrowserResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.page_load_timeout_ms) + Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let base_url = config.webdriver_url.trim_end_matches('/').to_string();
        let body = json!({ "capabilities": { "alwaysMatch": capabilities(config) } });

        let value = send(&client, Method::POST, &format!("{}/session", base_url), "new session", Some(body))
            .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("new session response lacks sessionId".to_string()))?
            .to_string();

        tracing::info!("Opened WebDriver session {} at {}", session_id, base_url);

        let browser = Self {
            client,
            base_url,
            session_id,
        };

        browser
            .command(
                Method::POST,
                "timeouts",
                Some(json!({ "pageLoad": config.page_load_timeout_ms, "implicit": 0 })),
            )
            .await?;

        Ok(browser)
    }

    /// Returns the WebDriver session identifier
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Sends a command scoped to this session; an empty path addresses the session itself
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> BrowserResult<Value> {
        let url = if path.is_empty() {
            format!("{}/session/{}", self.base_url, self.session_id)
        } else {
            format!("{}/session/{}/{}", self.base_url, self.session_id, path)
        };
        send(&self.client, method, &url, path, body).await
    }

    /// Finds the first element matching a CSS selector
    async fn find_element(&self, selector: &str) -> BrowserResult<Option<String>> {
        let body = json!({ "using": "css selector", "value": selector });
        match self.command(Method::POST, "element", Some(body)).await {
            Ok(value) => element_id(&value).map(Some),
            Err(BrowserError::Command { code, .. }) if code == NO_SUCH_ELEMENT => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Finds every element matching a CSS selector below `parent`
    async fn find_child_elements(&self, parent: &str, selector: &str) -> BrowserResult<Vec<String>> {
        let body = json!({ "using": "css selector", "value": selector });
        let value = self
            .command(Method::POST, &format!("element/{}/elements", parent), Some(body))
            .await?;

        value
            .as_array()
            .ok_or_else(|| BrowserError::Protocol("find elements did not return an array".to_string()))?
            .iter()
            .map(element_id)
            .collect()
    }

    async fn require_element(&self, selector: &str) -> BrowserResult<String> {
        self.find_element(selector)
            .await?
            .ok_or_else(|| BrowserError::NoSuchElement {
                selector: selector.to_string(),
            })
    }

    async fn click_element(&self, element: &str) -> BrowserResult<()> {
        self.command(Method::POST, &format!("element/{}/click", element), None)
            .await?;
        Ok(())
    }

    async fn element_string(&self, element: &str, endpoint: &str) -> BrowserResult<String> {
        let value = self
            .command(Method::GET, &format!("element/{}/{}", element, endpoint), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&self, url: &str) -> BrowserResult<()> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn current_url(&self) -> BrowserResult<String> {
        let value = self.command(Method::GET, "url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol("current URL is not a string".to_string()))
    }

    async fn exists(&self, selector: &str) -> BrowserResult<bool> {
        Ok(self.find_element(selector).await?.is_some())
    }

    async fn is_visible(&self, selector: &str) -> BrowserResult<bool> {
        let Some(element) = self.find_element(selector).await? else {
            return Ok(false);
        };

        let value = self
            .command(Method::GET, &format!("element/{}/displayed", element), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        let element = self.require_element(selector).await?;
        self.click_element(&element).await
    }

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()> {
        let element = self.require_element(selector).await?;
        self.command(Method::POST, &format!("element/{}/clear", element), None)
            .await?;
        self.command(
            Method::POST,
            &format!("element/{}/value", element),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, choice: OptionChoice<'_>) -> BrowserResult<()> {
        let select = self.require_element(selector).await?;

        let option = match choice {
            OptionChoice::Value(value) => {
                let css = format!("option[value=\"{}\"]", escape_css_string(value));
                self.find_child_elements(&select, &css).await?.into_iter().next()
            }
            OptionChoice::Label(label) => {
                let mut found = None;
                for option in self.find_child_elements(&select, "option").await? {
                    if self.element_string(&option, "text").await?.trim() == label {
                        found = Some(option);
                        break;
                    }
                }
                found
            }
        };

        let option = option.ok_or_else(|| BrowserError::NoSuchOption {
            selector: selector.to_string(),
            choice: choice.to_string(),
        })?;

        self.click_element(&option).await
    }

    async fn outer_html(&self, selector: &str) -> BrowserResult<Option<String>> {
        match self.find_element(selector).await? {
            Some(element) => Ok(Some(self.element_string(&element, "property/outerHTML").await?)),
            None => Ok(None),
        }
    }

    async fn enter_frame(&self, selector: &str) -> BrowserResult<()> {
        let element = self.require_element(selector).await?;
        self.command(
            Method::POST,
            "frame",
            Some(json!({ "id": { ELEMENT_KEY: element } })),
        )
        .await?;
        Ok(())
    }

    async fn leave_frames(&self) -> BrowserResult<()> {
        self.command(Method::POST, "frame", Some(json!({ "id": null })))
            .await?;
        Ok(())
    }

    async fn cookies(&self) -> BrowserResult<Vec<Cookie>> {
        let value = self.command(Method::GET, "cookie", None).await?;
        serde_json::from_value(value)
            .map_err(|e| BrowserError::Protocol(format!("malformed cookie list: {}", e)))
    }

    async fn add_cookies(&self, cookies: &[Cookie]) -> BrowserResult<()> {
        let mut applied = 0;
        let mut last_error = None;

        for cookie in cookies {
            match self
                .command(Method::POST, "cookie", Some(json!({ "cookie": cookie })))
                .await
            {
                Ok(_) => applied += 1,
                Err(e) => {
                    tracing::warn!(
                        "Cookie '{}' for {} was rejected: {}",
                        cookie.name,
                        cookie.domain.as_deref().unwrap_or("current domain"),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if applied == 0 => Err(e),
            Some(_) => {
                tracing::info!("Applied {} of {} saved cookies", applied, cookies.len());
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn close(&self) -> BrowserResult<()> {
        self.command(Method::DELETE, "", None).await?;
        tracing::info!("Closed WebDriver session {}", self.session_id);
        Ok(())
    }
}

/// Sends one WebDriver request and unwraps the `value` envelope
async fn send(
    client: &Client,
    method: Method,
    url: &str,
    command: &str,
    body: Option<Value>,
) -> BrowserResult<Value> {
    let is_post = method == Method::POST;
    let mut request = client.request(method, url);
    if is_post {
        // POST commands must carry a JSON object, even an empty one
        request = request.json(&body.unwrap_or_else(|| json!({})));
    }

    let response = request.send().await?;
    let status = response.status();
    let mut payload: Value = response.json().await?;
    let value = payload.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    Err(BrowserError::Command {
        command: command.to_string(),
        code: value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
        message: value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Extracts the element reference from a find-element result
fn element_id(value: &Value) -> BrowserResult<String> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BrowserError::Protocol(format!("not an element reference: {}", value)))
}

/// Escapes a value for use inside a double-quoted CSS attribute selector
fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Builds capabilities understood by both chromedriver and geckodriver
fn capabilities(config: &BrowserConfig) -> Value {
    let mut chrome_args = vec!["--disable-extensions", "--disable-gpu"];
    let mut firefox_args = Vec::new();
    if config.headless {
        chrome_args.push("--headless=new");
        firefox_args.push("-headless");
    }

    json!({
        "acceptInsecureCerts": config.accept_insecure_certs,
        "pageLoadStrategy": "normal",
        "goog:chromeOptions": { "args": chrome_args },
        "moz:firefoxOptions": { "args": firefox_args },
    })
}
