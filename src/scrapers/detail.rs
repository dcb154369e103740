use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::BrowserError;
use crate::models::CandidateListing;
use crate::scrapers::listing::{FEED_ROW, FEED_SELECTOR, ROW_NAME};
use crate::scrapers::traits::{BrowserSession, WaitCondition};
use crate::scrapers::types::MinerConfig;

const PHONE_ITEM_PREFIX: &str = "phone:tel:";

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));
static PHONE_BUTTON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"button[data-item-id*="phone"]"#).expect("valid phone selector")
});
static LABELLED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[aria-label]").expect("valid label selector"));
static AUTHORITY_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[data-item-id^="authority"]"#).expect("valid website selector")
});
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid heading selector"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s\-()]+").expect("valid phone regex"));

/// What a detail view tells us about a business
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl DetailFields {
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            phone: extract_phone(&document),
            website: extract_website(&document),
        }
    }
}

/// Structured `phone:tel:` item first, then any phone-looking accessible label.
pub fn extract_phone(document: &Html) -> Option<String> {
    let structured = document.select(&PHONE_BUTTON).find_map(|button| {
        let item = button.value().attr("data-item-id")?;
        let number = item.split_once(PHONE_ITEM_PREFIX)?.1.trim();
        (!number.is_empty()).then(|| number.to_string())
    });
    if structured.is_some() {
        return structured;
    }

    document.select(&LABELLED).find_map(|element| {
        let label = element.value().attr("aria-label")?;
        let lower = label.to_lowercase();
        if !(lower.contains("telefone") || lower.contains("phone")) {
            return None;
        }
        let number = PHONE_RE.find(label)?.as_str();
        let number = number.trim_end_matches(|c: char| c.is_whitespace() || c == '-');
        Some(number.trim().to_string())
    })
}

/// Website button of the detail view, then any external link labelled as a site.
pub fn extract_website(document: &Html) -> Option<String> {
    let authority = document.select(&AUTHORITY_LINK).find_map(|link| {
        let href = link.value().attr("href")?;
        (href.starts_with("http") || href.starts_with("www")).then(|| href.to_string())
    });
    if authority.is_some() {
        return authority;
    }

    document.select(&ANCHOR).find_map(|link| {
        let href = link.value().attr("href")?;
        let label = link.value().attr("aria-label").unwrap_or_default();
        (label.to_lowercase().contains("site") && href.starts_with("http"))
            .then(|| href.to_string())
    })
}

/// True once a detail heading naming `name` is rendered.
pub fn heading_matches(html: &str, name: &str) -> bool {
    Html::parse_document(html)
        .select(&HEADING)
        .any(|h| h.text().collect::<String>().trim() == name)
}

/// The `href` of the feed row whose name is exactly `name`.
pub fn find_row_link(html: &str, name: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&FEED_ROW).find_map(|row| {
        let row_name = row.select(&ROW_NAME).next()?.text().collect::<String>();
        if row_name.trim() != name {
            return None;
        }
        row.select(&ANCHOR)
            .next()?
            .value()
            .attr("href")
            .map(str::to_string)
    })
}

/// CSS selector clicking the feed anchor with exactly this `href`.
pub fn row_link_selector(href: &str) -> String {
    let escaped = href.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"{FEED_SELECTOR} a[href="{escaped}"]"#)
}

/// A candidate after its detail view was (or failed to be) read
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCandidate {
    pub candidate: CandidateListing,
    pub website: Option<String>,
}

/// Opens detail views to recover phone numbers and websites
pub struct DetailResolver<'a> {
    browser: &'a dyn BrowserSession,
    config: &'a MinerConfig,
}

impl<'a> DetailResolver<'a> {
    pub fn new(browser: &'a dyn BrowserSession, config: &'a MinerConfig) -> Self {
        Self { browser, config }
    }

    /// Clicks each candidate's row in the live feed, in order. Only the first
    /// [`MinerConfig::detail_budget`] candidates are visited and returned.
    pub async fn resolve_in_feed(
        &self,
        candidates: Vec<CandidateListing>,
    ) -> Vec<ResolvedCandidate> {
        let budget = self.config.detail_budget(candidates.len());
        info!("📞 Extracting details for {} leads...", budget);

        let mut resolved = Vec::with_capacity(budget);
        for (idx, mut candidate) in candidates.into_iter().take(budget).enumerate() {
            info!("📱 [{}/{}] Details: {}", idx + 1, budget, candidate.name);

            let fields = match self.open_in_feed(&candidate.name).await {
                Ok(Some(fields)) => fields,
                Ok(None) => {
                    warn!("Row for {} is no longer in the feed", candidate.name);
                    DetailFields::default()
                }
                Err(e) => {
                    warn!("⚠️  Could not read details of {}: {}", candidate.name, e);
                    DetailFields::default()
                }
            };

            candidate.phone = fields.phone;
            resolved.push(ResolvedCandidate {
                candidate,
                website: fields.website,
            });
        }
        resolved
    }

    /// Opens the candidate's detail link directly. Any failure leaves the
    /// fields empty; the link is not retried.
    pub async fn resolve_by_link(&self, candidate: &CandidateListing) -> DetailFields {
        if candidate.detail_link.is_empty() {
            debug!("{} has no detail link", candidate.name);
            return DetailFields::default();
        }

        info!("   🔗 Looking up website of: {}", candidate.name);
        let result = async {
            self.browser
                .navigate(
                    &candidate.detail_link,
                    WaitCondition::NetworkIdle,
                    self.config.navigation_timeout,
                )
                .await?;
            let html = self.await_detail(&candidate.name).await?;
            Ok::<_, BrowserError>(DetailFields::from_html(&html))
        }
        .await;

        match result {
            Ok(fields) => {
                match &fields.website {
                    Some(site) => info!("   ✅ Website found: {}", site),
                    None => info!("   ⚠️  No website on the listing"),
                }
                fields
            }
            Err(e) => {
                warn!("   ❌ Could not open listing of {}: {}", candidate.name, e);
                DetailFields::default()
            }
        }
    }

    async fn open_in_feed(&self, name: &str) -> Result<Option<DetailFields>, BrowserError> {
        let html = self.browser.outer_html().await?;
        let Some(href) = find_row_link(&html, name) else {
            return Ok(None);
        };
        self.browser.click(&row_link_selector(&href)).await?;
        let html = self.await_detail(name).await?;
        Ok(Some(DetailFields::from_html(&html)))
    }

    /// Polls until the detail heading shows `name` or the settle delay runs
    /// out, then returns the last snapshot either way.
    async fn await_detail(&self, name: &str) -> Result<String, BrowserError> {
        let deadline = Instant::now() + self.config.settle_delay;
        loop {
            let html = self.browser.outer_html().await?;
            if heading_matches(&html, name) || Instant::now() >= deadline {
                return Ok(html);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(self.config.settle_poll_interval.min(remaining)).await;
        }
    }
}
