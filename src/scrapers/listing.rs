use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::models::CandidateListing;
use crate::scrapers::traits::{BrowserSession, WaitCondition};
use crate::scrapers::types::MinerConfig;

/// Scrollable container holding the search results
pub const FEED_SELECTOR: &str = r#"div[role="feed"]"#;

pub(crate) static FEED_ROW: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[role="feed"] > div > div[jsaction]"#).expect("valid row selector")
});
pub(crate) static ROW_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.fontHeadlineSmall").expect("valid name selector"));
static RATING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[role="img"]"#).expect("valid rating selector"));
static DETAIL_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="maps"]"#).expect("valid link selector"));

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)").expect("valid rating regex"));
static REVIEWS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d[\d.,\s]*)\)").expect("valid reviews regex"));

/// A result row as rendered, before any filtering
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub name: String,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub detail_link: String,
}

/// Parses "4,5 estrelas" or "Rated 4.5 stars" into 4.5.
pub fn parse_rating(label: &str) -> Option<f64> {
    let raw = RATING_RE.captures(label)?.get(1)?.as_str();
    raw.replace(',', ".").parse().ok()
}

/// First "(N)" group in the row text, thousands separators ignored; 0 if absent.
pub fn parse_review_count(text: &str) -> u32 {
    REVIEWS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect::<String>())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_row(row: &ElementRef<'_>) -> Option<FeedRow> {
    let name = row
        .select(&ROW_NAME)
        .next()
        .map(|el| element_text(&el))
        .filter(|name| !name.is_empty())?;

    let rating = row
        .select(&RATING)
        .next()
        .and_then(|el| el.value().attr("aria-label"))
        .and_then(parse_rating);

    let review_count = parse_review_count(&element_text(row));

    let detail_link = row
        .select(&DETAIL_LINK)
        .next()
        .and_then(|el| el.value().attr("href"))
        .unwrap_or_default()
        .to_string();

    Some(FeedRow {
        name,
        rating,
        review_count,
        detail_link,
    })
}

/// Every currently rendered row that carries a name.
pub fn parse_feed_rows(html: &str) -> Vec<FeedRow> {
    let document = Html::parse_document(html);
    document
        .select(&FEED_ROW)
        .filter_map(|row| {
            let parsed = parse_row(&row);
            if parsed.is_none() {
                debug!("Skipping feed row without a name");
            }
            parsed
        })
        .collect()
}

/// Number of rows rendered in the feed, named or not.
pub fn count_feed_rows(html: &str) -> usize {
    Html::parse_document(html).select(&FEED_ROW).count()
}

/// Keeps a row only when its rating parsed and falls inside the band.
pub fn within_band(row: FeedRow, config: &MinerConfig) -> Option<CandidateListing> {
    let rating = row.rating.filter(|r| config.rating_in_band(*r))?;
    Some(CandidateListing {
        name: row.name,
        rating: Some(rating),
        review_count: row.review_count,
        detail_link: row.detail_link,
        phone: None,
    })
}

/// Accumulated candidates, unique by name, in discovery order
#[derive(Debug, Default)]
pub struct CandidateSet {
    candidates: Vec<CandidateListing>,
    names: HashSet<String>,
}

impl CandidateSet {
    /// Adds unseen names; an existing entry is never overwritten.
    /// Returns how many candidates were added.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = CandidateListing>) -> usize {
        let mut added = 0;
        for candidate in incoming {
            if self.names.insert(candidate.name.clone()) {
                self.candidates.push(candidate);
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn into_vec(self) -> Vec<CandidateListing> {
        self.candidates
    }
}

/// Drives the search feed: extract, merge, scroll, settle, repeat
pub struct ListingCrawler<'a> {
    browser: &'a dyn BrowserSession,
    config: &'a MinerConfig,
}

impl<'a> ListingCrawler<'a> {
    pub fn new(browser: &'a dyn BrowserSession, config: &'a MinerConfig) -> Self {
        Self { browser, config }
    }

    /// Collects in-band candidates until the target count or the scroll cap.
    ///
    /// Fails only when the feed never appears; a crawl that runs out of
    /// iterations returns whatever it gathered.
    pub async fn crawl(&self) -> Result<Vec<CandidateListing>, PipelineError> {
        let config = self.config;
        info!("🔍 Searching: {}", config.query());

        // Readiness is decided by the feed wait, not the document state.
        self.browser
            .navigate(&config.search_url(), WaitCondition::Load, config.navigation_timeout)
            .await
            .map_err(PipelineError::FeedUnavailable)?;
        self.browser
            .wait_for_selector(FEED_SELECTOR, config.feed_timeout)
            .await
            .map_err(PipelineError::FeedUnavailable)?;

        info!("📜 Scrolling the results feed to load more listings...");
        let mut candidates = CandidateSet::default();

        for iteration in 0..config.max_scroll_iterations {
            let html = match self.browser.outer_html().await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Could not read feed on pass {}: {}", iteration + 1, e);
                    String::new()
                }
            };

            let rendered = count_feed_rows(&html);
            let rows = parse_feed_rows(&html);
            if iteration == 0 && rendered == 0 {
                self.save_debug_snapshot(&html).await;
            }

            let added =
                candidates.merge(rows.into_iter().filter_map(|row| within_band(row, config)));
            info!(
                "📊 Leads collected so far: {} (+{} on pass {})",
                candidates.len(),
                added,
                iteration + 1
            );

            if candidates.len() >= config.target_count {
                break;
            }

            if let Err(e) = self.browser.scroll(FEED_SELECTOR, config.scroll_step).await {
                warn!("Scroll failed on pass {}: {}", iteration + 1, e);
            }
            self.settle(rendered).await;
        }

        if candidates.len() < config.target_count {
            info!(
                "Stopped with {} of {} target leads",
                candidates.len(),
                config.target_count
            );
        }

        Ok(candidates.into_vec())
    }

    /// Waits for freshly loaded rows: returns once the row count has grown
    /// past `previous` and two consecutive reads agree, or after `settle_delay`.
    async fn settle(&self, previous: usize) {
        let deadline = Instant::now() + self.config.settle_delay;
        let mut last_count = None;

        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(self.config.settle_poll_interval.min(remaining)).await;

            let count = match self.browser.outer_html().await {
                Ok(html) => count_feed_rows(&html),
                Err(_) => continue,
            };
            if count > previous && last_count == Some(count) {
                debug!("Feed settled at {} rows", count);
                return;
            }
            last_count = Some(count);
        }
    }

    async fn save_debug_snapshot(&self, html: &str) {
        let Some(dir) = &self.config.debug_dir else {
            return;
        };
        let path = dir.join("feed_page.html");
        match write_snapshot(dir, &path, html).await {
            Ok(()) => info!("Saved empty feed HTML to {} ({} bytes)", path.display(), html.len()),
            Err(e) => warn!("Could not save feed HTML: {}", e),
        }
    }
}

async fn write_snapshot(dir: &Path, path: &Path, html: &str) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, html).await
}
