//! `Browser` over the W3C WebDriver HTTP protocol
//!
//! Talks to chromedriver/geckodriver (or a Selenium server) with `reqwest`.
//! Waits poll the DOM through the driver at a fixed interval until the
//! configured timeout.

use crate::browser::{Browser, Locator};
use crate::config::{BrowserConfig, WaitConfig};
use crate::error::{NetcheckError, NetcheckResult};
use crate::wait::{poll_until, tries_for, wait_until};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key under which WebDriver returns element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// HTTP request timeout for a single WebDriver command
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WebDriverBrowser {
    client: Client,
    endpoint: String,
    session_id: String,
    timeout: Duration,
    poll: Duration,
}

impl WebDriverBrowser {
    /// Start a new browser session
    pub async fn connect(config: &BrowserConfig, wait: &WaitConfig) -> NetcheckResult<Self> {
        let client = Client::builder()
            .timeout(COMMAND_TIMEOUT)
            .build()?;
        let endpoint = config.webdriver_url.trim_end_matches('/').to_string();

        let mut chrome_args = vec!["--window-size=1920,1200"];
        let mut firefox_args = Vec::new();
        if config.headless {
            chrome_args.push("--headless=new");
            firefox_args.push("-headless");
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "acceptInsecureCerts": true,
                    "goog:chromeOptions": { "args": chrome_args },
                    "moz:firefoxOptions": { "args": firefox_args }
                }
            }
        });

        let value = send(&client, Method::POST, &format!("{}/session", endpoint), Some(capabilities)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| NetcheckError::Browser("WebDriver returned no sessionId".to_string()))?
            .to_string();

        info!("Started WebDriver session {} at {}", session_id, endpoint);

        Ok(Self {
            client,
            endpoint,
            session_id,
            timeout: wait.browser_timeout(),
            poll: wait.browser_poll(),
        })
    }

    /// Navigate the session to `url`
    pub async fn open(&self, url: &str) -> NetcheckResult<()> {
        info!("Opening {}", url);
        self.command(Method::POST, "url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    /// End the session
    pub async fn close(self) -> NetcheckResult<()> {
        let url = format!("{}/session/{}", self.endpoint, self.session_id);
        send(&self.client, Method::DELETE, &url, None).await?;
        info!("Closed WebDriver session {}", self.session_id);
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> NetcheckResult<Value> {
        let url = format!("{}/session/{}/{}", self.endpoint, self.session_id, path);
        send(&self.client, method, &url, body).await
    }

    fn tries(&self) -> u32 {
        tries_for(self.timeout, self.poll)
    }

    async fn find_elements(&self, locator: &Locator) -> NetcheckResult<Vec<String>> {
        let scopes = element_ids(
            self.command(
                Method::POST,
                "elements",
                Some(json!({ "using": "css selector", "value": locator.css })),
            )
            .await?,
        );

        let Some(filter) = &locator.text_filter else {
            return Ok(scopes);
        };

        let xpath = filter.xpath();
        let mut found = Vec::new();
        for scope in scopes {
            let children = self
                .command(
                    Method::POST,
                    &format!("element/{}/elements", scope),
                    Some(json!({ "using": "xpath", "value": xpath })),
                )
                .await;
            merge_scoped(&mut found, children)?;
        }
        Ok(found)
    }

    async fn is_displayed(&self, element: &str) -> NetcheckResult<bool> {
        let value = self
            .command(Method::GET, &format!("element/{}/displayed", element), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_selected(&self, element: &str) -> NetcheckResult<bool> {
        let value = self
            .command(Method::GET, &format!("element/{}/selected", element), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// First displayed element matching `locator`, if any
    async fn visible_element(&self, locator: &Locator) -> NetcheckResult<Option<String>> {
        for element in self.find_elements(locator).await? {
            match self.is_displayed(&element).await {
                Ok(true) => return Ok(Some(element)),
                Ok(false) => {}
                Err(e) if is_transient(&e) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn wait_for_visible_element(&self, selector: &str) -> NetcheckResult<String> {
        let locator = &Locator::parse(selector);
        poll_until(&format!("visible {}", selector), self.poll, self.tries(), move || async move {
            self.visible_element(locator).await
        })
        .await
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn click(&self, selector: &str) -> NetcheckResult<()> {
        debug!("click {}", selector);
        let element = self.wait_for_visible_element(selector).await?;
        self.command(Method::POST, &format!("element/{}/click", element), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn wait_present(&self, selector: &str) -> NetcheckResult<()> {
        debug!("wait present {}", selector);
        let locator = &Locator::parse(selector);
        wait_until(&format!("present {}", selector), self.poll, self.tries(), move || async move {
            Ok(!self.find_elements(locator).await?.is_empty())
        })
        .await
    }

    async fn wait_visible(&self, selector: &str) -> NetcheckResult<()> {
        debug!("wait visible {}", selector);
        self.wait_for_visible_element(selector).await.map(|_| ())
    }

    async fn wait_not_present(&self, selector: &str) -> NetcheckResult<()> {
        debug!("wait not present {}", selector);
        let locator = &Locator::parse(selector);
        wait_until(&format!("absent {}", selector), self.poll, self.tries(), move || async move {
            Ok(self.find_elements(locator).await?.is_empty())
        })
        .await
    }

    async fn switch_to_frame(&self, name: &str) -> NetcheckResult<()> {
        debug!("switch to frame {}", name);
        let selector = format!("iframe[name='{}']", name);
        let locator = &Locator::parse(&selector);
        let frame = poll_until(&format!("frame {}", name), self.poll, self.tries(), move || async move {
            Ok(self.find_elements(locator).await?.into_iter().next())
        })
        .await?;

        self.command(Method::POST, "frame", Some(json!({ "id": { ELEMENT_KEY: frame } })))
            .await?;
        Ok(())
    }

    async fn switch_to_top(&self) -> NetcheckResult<()> {
        debug!("switch to top");
        self.command(Method::POST, "frame", Some(json!({ "id": null }))).await?;
        Ok(())
    }

    async fn set_checked(&self, selector: &str, checked: bool) -> NetcheckResult<()> {
        debug!("set {} checked={}", selector, checked);
        let element = self.wait_for_visible_element(selector).await?;
        if self.is_selected(&element).await? != checked {
            self.command(Method::POST, &format!("element/{}/click", element), Some(json!({})))
                .await?;
        }
        Ok(())
    }
}

async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> NetcheckResult<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        warn!("WebDriver {} -> {} {}", url, status, error);
        return Err(NetcheckError::Browser(format!("{}: {}", error, message)));
    }

    Ok(value)
}

fn element_ids(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Errors caused by the DOM changing between two driver calls
fn is_transient(error: &NetcheckError) -> bool {
    matches!(error, NetcheckError::Browser(msg)
        if msg.starts_with("stale element reference") || msg.starts_with("no such element"))
}

/// Add the matches found under one scope; a scope that went stale is skipped
fn merge_scoped(found: &mut Vec<String>, children: NetcheckResult<Value>) -> NetcheckResult<()> {
    match children {
        Ok(value) => found.extend(element_ids(value)),
        Err(e) if is_transient(&e) => debug!("Skipping scope: {}", e),
        Err(e) => return Err(e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_ids() {
        let value = json!([
            { ELEMENT_KEY: "e1" },
            { ELEMENT_KEY: "e2" },
            { "unexpected": "e3" }
        ]);
        assert_eq!(element_ids(value), vec!["e1".to_string(), "e2".to_string()]);
        assert!(element_ids(json!(null)).is_empty());
    }

    #[test]
    fn test_merge_scoped_skips_stale_scope() {
        let mut found = Vec::new();
        merge_scoped(&mut found, Ok(json!([{ ELEMENT_KEY: "e1" }]))).unwrap();
        merge_scoped(
            &mut found,
            Err(NetcheckError::Browser("stale element reference: detached".to_string())),
        )
        .unwrap();
        merge_scoped(&mut found, Ok(json!([{ ELEMENT_KEY: "e2" }]))).unwrap();
        assert_eq!(found, vec!["e1", "e2"]);

        let result = merge_scoped(
            &mut found,
            Err(NetcheckError::Browser("invalid session id: gone".to_string())),
        );
        assert!(matches!(result, Err(NetcheckError::Browser(_))));
    }

    #[test]
    fn test_is_transient() {
        assert!(is_transient(&NetcheckError::Browser(
            "stale element reference: element is not attached".to_string()
        )));
        assert!(is_transient(&NetcheckError::Browser("no such element: gone".to_string())));
        assert!(!is_transient(&NetcheckError::Browser("invalid session id: ".to_string())));
        assert!(!is_transient(&NetcheckError::Timeout("x".to_string())));
    }
}
