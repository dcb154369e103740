//! Scripted in-memory [`BrowserSession`] for exercising the pipeline
//! without Chrome.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::BrowserError;
use crate::scrapers::traits::{
    BrowserSession, WaitCondition, OUTER_HTML_SCRIPT, VISIBLE_TEXT_SCRIPT,
};

const SEARCH_PREFIX: &str = "https://www.google.com/maps/search/";

#[derive(Clone)]
struct FakePage {
    text: String,
    html: String,
}

#[derive(Clone)]
enum Current {
    Blank,
    Feed,
    Page(FakePage),
}

struct State {
    feed_frames: Vec<String>,
    frame: usize,
    detail: Option<String>,
    details: HashMap<String, String>,
    pages: HashMap<String, Result<FakePage, BrowserError>>,
    current: Current,
    navigations: Vec<String>,
    clicks: Vec<String>,
    scrolls: usize,
    closed: bool,
}

/// Replays feed snapshots (one per scroll), detail panels keyed by the
/// clicked selector, and pages keyed by URL.
pub struct FakeBrowser {
    state: Mutex<State>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                feed_frames: Vec::new(),
                frame: 0,
                detail: None,
                details: HashMap::new(),
                pages: HashMap::new(),
                current: Current::Blank,
                navigations: Vec::new(),
                clicks: Vec::new(),
                scrolls: 0,
                closed: false,
            }),
        }
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed markup rendered before the first scroll, after the first, and so on.
    /// The last frame repeats once the list is exhausted.
    pub fn with_feed_frames(self, frames: Vec<String>) -> Self {
        self.state.lock().unwrap().feed_frames = frames;
        self
    }

    pub fn with_detail(self, selector: &str, html: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .details
            .insert(selector.to_string(), html.to_string());
        self
    }

    pub fn with_page(self, url: &str, text: &str, html: &str) -> Self {
        self.state.lock().unwrap().pages.insert(
            url.to_string(),
            Ok(FakePage {
                text: text.to_string(),
                html: html.to_string(),
            }),
        );
        self
    }

    pub fn with_failing_page(self, url: &str, error: BrowserError) -> Self {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), Err(error));
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl State {
    fn current_html(&self) -> String {
        match &self.current {
            Current::Blank => "<html><body></body></html>".to_string(),
            Current::Feed => {
                let feed = self
                    .feed_frames
                    .get(self.frame.min(self.feed_frames.len().saturating_sub(1)))
                    .cloned()
                    .unwrap_or_default();
                let detail = self.detail.clone().unwrap_or_default();
                format!("<html><body>{feed}{detail}</body></html>")
            }
            Current::Page(page) => page.html.clone(),
        }
    }

    fn current_text(&self) -> String {
        match &self.current {
            Current::Page(page) => page.text.clone(),
            _ => String::new(),
        }
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn navigate(
        &self,
        url: &str,
        _wait: WaitCondition,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        state.detail = None;
        if let Some(page) = state.pages.get(url).cloned() {
            state.current = Current::Blank;
            let page = page?;
            state.current = Current::Page(page);
            return Ok(());
        }
        if url.starts_with(SEARCH_PREFIX) {
            state.current = Current::Feed;
            state.frame = 0;
            return Ok(());
        }
        Err(BrowserError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let html = self.state.lock().unwrap().current_html();
        let parsed = Selector::parse(selector)
            .map_err(|e| BrowserError::Evaluation(format!("bad selector {selector}: {e:?}")))?;
        if Html::parse_document(&html).select(&parsed).next().is_some() {
            Ok(())
        } else {
            Err(BrowserError::Timeout {
                what: selector.to_string(),
                timeout,
            })
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        let state = self.state.lock().unwrap();
        match script {
            OUTER_HTML_SCRIPT => Ok(Value::String(state.current_html())),
            VISIBLE_TEXT_SCRIPT => Ok(Value::String(state.current_text())),
            other => Err(BrowserError::Evaluation(format!("unscripted: {other}"))),
        }
    }

    async fn scroll(&self, _container: &str, _delta_y: i64) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.scrolls += 1;
        state.frame += 1;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.clicks.push(selector.to_string());
        match state.details.get(selector).cloned() {
            Some(html) => {
                state.detail = Some(html);
                Ok(())
            }
            None => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// One rendered result row in the feed's markup.
pub fn feed_row(name: &str, rating_label: Option<&str>, reviews: &str, href: &str) -> String {
    let rating = rating_label
        .map(|label| format!(r#"<span role="img" aria-label="{label}"></span>"#))
        .unwrap_or_default();
    format!(
        r#"<div><div jsaction="pane.resultSection.click"><a href="{href}" aria-label="{name}"></a><div class="fontHeadlineSmall">{name}</div><span>{rating}<span>{reviews}</span></span></div></div>"#
    )
}

pub fn feed(rows: &[String]) -> String {
    format!(r#"<div role="feed">{}</div>"#, rows.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_browser_starts_blank_and_open() {
        let browser = FakeBrowser::default();

        assert_eq!(browser.outer_html().await.unwrap(), "<html><body></body></html>");
        assert!(browser.navigations().is_empty());
        assert!(!browser.is_closed());
    }
}
