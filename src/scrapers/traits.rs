use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BrowserError;

/// Script returning the serialized DOM of the current page.
pub const OUTER_HTML_SCRIPT: &str = "document.documentElement.outerHTML";

/// Script returning the rendered, human-visible text of the current page.
pub const VISIBLE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// The load event fired
    Load,
    /// Loaded and the document reports itself complete
    NetworkIdle,
}

/// Narrow browser-automation capability consumed by every pipeline stage.
///
/// Extraction logic never touches the page directly: it asks for a snapshot
/// through [`BrowserSession::outer_html`] or [`BrowserSession::visible_text`]
/// and parses the returned string, so any engine (or a scripted fake) can
/// drive the pipeline.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Waits until `selector` matches an element, failing with
    /// [`BrowserError::Timeout`] once `timeout` elapses.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError>;

    /// Scrolls the first element matching `container` by `delta_y` pixels.
    async fn scroll(&self, container: &str, delta_y: i64) -> Result<(), BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Releases the page and the browser process behind it.
    async fn close(&self) -> Result<(), BrowserError>;

    async fn outer_html(&self) -> Result<String, BrowserError> {
        value_as_string(self.evaluate(OUTER_HTML_SCRIPT).await?)
    }

    async fn visible_text(&self) -> Result<String, BrowserError> {
        value_as_string(self.evaluate(VISIBLE_TEXT_SCRIPT).await?)
    }
}

fn value_as_string(value: Value) -> Result<String, BrowserError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(BrowserError::Evaluation(format!(
            "expected a string snapshot, got {other}"
        ))),
    }
}
