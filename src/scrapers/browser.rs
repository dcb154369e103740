use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::BrowserError;
use crate::scrapers::traits::{BrowserSession, WaitCondition};

const WINDOW_SIZE: (u32, u32) = (1280, 720);
/// Chrome drops an idle DevTools connection after 30s by default, shorter
/// than a long detail-resolution batch.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);
const READY_STATE_POLL: Duration = Duration::from_millis(200);

/// [`BrowserSession`] backed by a single headless Chrome tab
pub struct ChromeSession {
    // Dropping the browser kills the Chrome process.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch Chrome and open the tab every stage will share
    pub fn launch(headless: bool) -> Result<Self, BrowserError> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .sandbox(false)
            .window_size(Some(WINDOW_SIZE))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| BrowserError::Launch(format!("invalid launch options: {e}")))?;

        let browser = Browser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Launch(format!("could not open tab: {e}")))?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Runs a blocking CDP call off the async runtime.
    async fn on_tab<T, F>(&self, op: F) -> Result<T, BrowserError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab))
            .await
            .map_err(|e| BrowserError::Task(e.to_string()))?
    }
}

fn is_timeout_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("never came") || lower.contains("timed out") || lower.contains("timeout")
}

fn wait_for_complete_document(
    tab: &Tab,
    started: Instant,
    timeout: Duration,
) -> Result<(), BrowserError> {
    loop {
        let state = tab
            .evaluate("document.readyState", false)
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        if state.value.as_ref().and_then(Value::as_str) == Some("complete") {
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(BrowserError::Timeout {
                what: "document to finish loading".to_string(),
                timeout,
            });
        }
        thread::sleep(READY_STATE_POLL);
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let url = url.to_string();
        debug!("Navigating to {}", url);
        self.on_tab(move |tab| {
            let started = Instant::now();
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)
                .map_err(|e| BrowserError::navigation(&url, e.to_string()))?;
            tab.wait_until_navigated().map_err(|e| {
                let message = e.to_string();
                if is_timeout_message(&message) {
                    BrowserError::Timeout {
                        what: format!("navigation to {url}"),
                        timeout,
                    }
                } else {
                    BrowserError::navigation(&url, message)
                }
            })?;
            if wait == WaitCondition::NetworkIdle {
                wait_for_complete_document(tab, started, timeout)?;
            }
            Ok(())
        })
        .await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        self.on_tab(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .map(|_| ())
                .map_err(|e| {
                    let message = e.to_string();
                    if is_timeout_message(&message) {
                        BrowserError::Timeout {
                            what: selector.clone(),
                            timeout,
                        }
                    } else {
                        BrowserError::ElementNotFound(format!("{selector}: {message}"))
                    }
                })
        })
        .await
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        let script = script.to_string();
        self.on_tab(move |tab| {
            let result = tab
                .evaluate(&script, false)
                .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }

    async fn scroll(&self, container: &str, delta_y: i64) -> Result<(), BrowserError> {
        let target = serde_json::to_string(container)
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        let script = format!(
            "(() => {{ const el = document.querySelector({target}); \
             if (!el) return false; el.scrollBy(0, {delta_y}); return true; }})()"
        );
        match self.evaluate(&script).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(BrowserError::ElementNotFound(container.to_string())),
        }
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        self.on_tab(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| BrowserError::ElementNotFound(format!("{selector}: {e}")))?;
            element
                .click()
                .map_err(|e| BrowserError::Evaluation(format!("click on {selector} failed: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<(), BrowserError> {
        info!("Closing browser tab");
        self.on_tab(|tab| {
            tab.close(true)
                .map(|_| ())
                .map_err(|e| BrowserError::Task(format!("closing tab failed: {e}")))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_headless_chrome_timeout_messages() {
        assert!(is_timeout_message("The event waited for never came"));
        assert!(is_timeout_message("Navigation Timeout exceeded"));
        assert!(!is_timeout_message("Navigate failed: net::ERR_NAME_NOT_RESOLVED"));
    }
}
