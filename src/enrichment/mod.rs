pub mod signals;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::BrowserError;
use crate::models::EnrichmentResult;
use crate::scrapers::{BrowserSession, MinerConfig, WaitCondition};

use signals::{
    classify_service, detect_scheduling, extract_responsible_party, page_links, PageLink,
};

/// Visible text and outbound links of a loaded website
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub text: String,
    pub links: Vec<PageLink>,
}

impl PageSnapshot {
    pub fn new(text: impl Into<String>, html: &str) -> Self {
        Self {
            text: text.into(),
            links: page_links(html),
        }
    }
}

/// Derives every enrichment signal from a snapshot. Pure: the same snapshot
/// always yields the same result.
pub fn analyze(snapshot: &PageSnapshot) -> EnrichmentResult {
    let mut result = EnrichmentResult::default();

    if let Some(name) = extract_responsible_party(&snapshot.text) {
        result.responsible_party = name;
    }

    let scheduling = detect_scheduling(&snapshot.links);
    result.has_direct_messaging = scheduling.has_direct_messaging;
    result.has_web_form = scheduling.has_web_form;
    result.scheduling_channel = scheduling.channel();

    if let Some(service) = classify_service(&snapshot.text) {
        result.primary_service = service.display_name();
        result.service_tier = service.tier;
    }

    result
}

/// Visits candidate websites and turns them into [`EnrichmentResult`]s
pub struct Enricher<'a> {
    browser: &'a dyn BrowserSession,
    config: &'a MinerConfig,
}

impl<'a> Enricher<'a> {
    pub fn new(browser: &'a dyn BrowserSession, config: &'a MinerConfig) -> Self {
        Self { browser, config }
    }

    /// Never fails: an absent website yields the defaults without any
    /// navigation, and an unreachable one yields the defaults flagged as a
    /// broken link.
    pub async fn enrich(&self, website: Option<&str>) -> EnrichmentResult {
        let Some(url) = website else {
            return EnrichmentResult::default();
        };

        info!("   📊 Analyzing: {}", url);
        if let Err(e) = self
            .browser
            .navigate(url, WaitCondition::NetworkIdle, self.config.navigation_timeout)
            .await
        {
            warn!("   ❌ Could not open {}: {}", url, e);
            return EnrichmentResult {
                broken_link: e.is_navigation_failure(),
                ..EnrichmentResult::default()
            };
        }

        sleep(self.config.settle_delay).await;

        match self.snapshot().await {
            Ok(snapshot) => {
                let result = analyze(&snapshot);
                info!("   ✅ Analysis complete");
                result
            }
            Err(e) => {
                warn!("   ❌ Could not analyze {}: {}", url, e);
                EnrichmentResult {
                    broken_link: e.is_network_class(),
                    ..EnrichmentResult::default()
                }
            }
        }
    }

    async fn snapshot(&self) -> Result<PageSnapshot, BrowserError> {
        let text = self.browser.visible_text().await?;
        let html = self.browser.outer_html().await?;
        Ok(PageSnapshot::new(text, &html))
    }
}
