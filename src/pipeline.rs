//! Stage orchestration for the three commands.
//!
//! Every entry point takes the browser by reference and closes it before
//! returning, whether the stages succeeded or not.

use std::future::Future;

use tracing::{info, warn};

use crate::enrichment::Enricher;
use crate::error::PipelineError;
use crate::models::{CandidateListing, ScoredLead};
use crate::scoring::{rank, score_lead};
use crate::scrapers::{
    BrowserSession, DetailResolver, ListingCrawler, MinerConfig, ResolvedCandidate,
};

async fn with_session<T>(
    browser: &dyn BrowserSession,
    work: impl Future<Output = Result<T, PipelineError>>,
) -> Result<T, PipelineError> {
    let result = work.await;
    if let Err(e) = browser.close().await {
        warn!("Could not close browser cleanly: {}", e);
    }
    result
}

async fn discover(
    browser: &dyn BrowserSession,
    config: &MinerConfig,
) -> Result<Vec<ResolvedCandidate>, PipelineError> {
    let candidates = ListingCrawler::new(browser, config).crawl().await?;
    info!("✅ Found {} leads in the rating band", candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        info!(
            "   [{}/{}] {} ({} ⭐, {} reviews)",
            idx + 1,
            candidates.len(),
            candidate.name,
            candidate.rating.map(|r| r.to_string()).unwrap_or_default(),
            candidate.review_count
        );
    }

    Ok(DetailResolver::new(browser, config)
        .resolve_in_feed(candidates)
        .await)
}

/// Enriches and scores resolved candidates, highest score first.
async fn score_resolved(
    browser: &dyn BrowserSession,
    config: &MinerConfig,
    resolved: Vec<ResolvedCandidate>,
) -> Vec<ScoredLead> {
    let enricher = Enricher::new(browser, config);
    let total = resolved.len();
    info!("🔬 Enriching {} leads...", total);

    let mut leads = Vec::with_capacity(total);
    for (idx, ResolvedCandidate { candidate, website }) in resolved.into_iter().enumerate() {
        info!("[{}/{}] {}", idx + 1, total, candidate.name);
        let enrichment = enricher.enrich(website.as_deref()).await;
        let lead = score_lead(candidate, website, enrichment);
        info!("   🎯 Score {} ({})", lead.score, lead.diagnosis);
        leads.push(lead);
    }

    rank(&mut leads);
    leads
}

/// Crawl plus in-feed detail resolution. Returns the candidates with phones.
pub async fn mine(
    browser: &dyn BrowserSession,
    config: &MinerConfig,
) -> Result<Vec<CandidateListing>, PipelineError> {
    with_session(browser, async {
        let resolved = discover(browser, config).await?;
        Ok(resolved.into_iter().map(|r| r.candidate).collect())
    })
    .await
}

/// Standalone enrichment of a previously mined candidate list. Websites are
/// looked up by opening each candidate's detail link.
pub async fn enrich(
    browser: &dyn BrowserSession,
    config: &MinerConfig,
    candidates: Vec<CandidateListing>,
) -> Result<Vec<ScoredLead>, PipelineError> {
    with_session(browser, async {
        let resolver = DetailResolver::new(browser, config);
        let total = candidates.len();

        let mut resolved = Vec::with_capacity(total);
        for (idx, mut candidate) in candidates.into_iter().enumerate() {
            info!("[{}/{}] Resolving {}", idx + 1, total, candidate.name);
            let fields = resolver.resolve_by_link(&candidate).await;
            if candidate.phone.is_none() {
                candidate.phone = fields.phone;
            }
            resolved.push(ResolvedCandidate {
                candidate,
                website: fields.website,
            });
        }

        Ok(score_resolved(browser, config, resolved).await)
    })
    .await
}

/// The whole pipeline in one browser session.
pub async fn run(
    browser: &dyn BrowserSession,
    config: &MinerConfig,
) -> Result<Vec<ScoredLead>, PipelineError> {
    with_session(browser, async {
        let resolved = discover(browser, config).await?;
        Ok(score_resolved(browser, config, resolved).await)
    })
    .await
}

/// Human-readable lines for the best `top` leads.
pub fn summary(leads: &[ScoredLead], top: usize) -> Vec<String> {
    leads
        .iter()
        .take(top)
        .enumerate()
        .map(|(idx, lead)| {
            format!(
                "{}. {} | score {} | {} | {} | {}",
                idx + 1,
                lead.candidate.name,
                lead.score,
                lead.diagnosis,
                lead.enrichment.primary_service,
                lead.candidate.phone_or_sentinel()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;
    use crate::models::{Diagnosis, SchedulingChannel};
    use crate::scrapers::detail::row_link_selector;
    use crate::scrapers::fake::{feed, feed_row, FakeBrowser};
    use std::time::Duration;

    const FORM_SITE: &str = "https://bella.example";
    const DOWN_SITE: &str = "https://down.example";

    fn test_config() -> MinerConfig {
        MinerConfig {
            settle_delay: Duration::ZERO,
            target_count: 3,
            ..MinerConfig::default()
        }
    }

    fn link(name: &str) -> String {
        format!("https://www.google.com/maps/place/{name}")
    }

    fn panel(name: &str, phone: &str, site: Option<&str>) -> String {
        let site = site
            .map(|s| format!(r#"<a data-item-id="authority" href="{s}"></a>"#))
            .unwrap_or_default();
        format!(r#"<div role="main"><h1>{name}</h1><button data-item-id="phone:tel:{phone}"></button>{site}</div>"#)
    }

    /// Three in-band clinics: one with a form-only site, one without a site
    /// and one whose site is unreachable. A fourth row is out of band.
    fn scripted_browser() -> FakeBrowser {
        FakeBrowser::new()
            .with_feed_frames(vec![feed(&[
                feed_row("Bella", Some("4,2 estrelas"), "(120)", &link("bella")),
                feed_row("Nova Pele", Some("4,5 estrelas"), "(33)", &link("novapele")),
                feed_row("Top", Some("4,9 estrelas"), "(900)", &link("top")),
                feed_row("Caída", Some("3,6 estrelas"), "(8)", &link("caida")),
            ])])
            .with_detail(
                &row_link_selector(&link("bella")),
                &panel("Bella", "+551130000001", Some(FORM_SITE)),
            )
            .with_detail(
                &row_link_selector(&link("novapele")),
                &panel("Nova Pele", "+551130000002", None),
            )
            .with_detail(
                &row_link_selector(&link("caida")),
                &panel("Caída", "+551130000003", Some(DOWN_SITE)),
            )
            .with_page(
                FORM_SITE,
                "Dra. Carla Menezes\nHarmonização facial e botox. Botox sem dor.",
                r##"<a href="#">Agendar avaliação</a>"##,
            )
            .with_failing_page(
                DOWN_SITE,
                BrowserError::navigation(DOWN_SITE, "net::ERR_CONNECTION_REFUSED"),
            )
    }

    #[tokio::test]
    async fn run_scores_and_ranks_every_resolved_lead() {
        let browser = scripted_browser();
        let config = test_config();

        let leads = run(&browser, &config).await.unwrap();

        let names: Vec<_> = leads.iter().map(|l| l.candidate.name.as_str()).collect();
        // Ties keep discovery order.
        assert_eq!(names, ["Bella", "Nova Pele", "Caída"]);

        let bella = &leads[0];
        assert_eq!(bella.website.as_deref(), Some(FORM_SITE));
        assert_eq!(bella.enrichment.responsible_party, "Carla Menezes");
        assert_eq!(bella.enrichment.scheduling_channel, SchedulingChannel::WebForm);
        assert_eq!(bella.diagnosis, Diagnosis::HighFriction);
        assert_eq!(bella.score, 10);

        let broken = &leads[2];
        assert!(broken.enrichment.broken_link);
        assert_eq!(broken.diagnosis, Diagnosis::BrokenLink);
        assert_eq!(broken.score, 7);

        let no_site = &leads[1];
        assert_eq!(no_site.website, None);
        assert_eq!(no_site.diagnosis, Diagnosis::NoWebsite);
        assert_eq!(no_site.score, 7);
        assert_eq!(no_site.candidate.phone.as_deref(), Some("+551130000002"));

        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn no_website_lead_is_never_navigated() {
        let browser = scripted_browser();
        let config = test_config();

        run(&browser, &config).await.unwrap();

        let navigations = browser.navigations();
        assert_eq!(navigations.len(), 3);
        assert!(navigations[0].starts_with("https://www.google.com/maps/search/"));
        assert_eq!(&navigations[1..], [FORM_SITE, DOWN_SITE]);
    }

    #[tokio::test]
    async fn mine_returns_candidates_with_phones() {
        let browser = scripted_browser();
        let config = test_config();

        let candidates = mine(&browser, &config).await.unwrap();

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].name, "Bella");
        assert_eq!(candidates[0].phone.as_deref(), Some("+551130000001"));
        assert_eq!(candidates[0].review_count, 120);
        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn fatal_feed_error_still_closes_the_browser() {
        let browser = FakeBrowser::new();
        let config = test_config();

        let err = run(&browser, &config).await.unwrap_err();

        assert!(matches!(err, PipelineError::FeedUnavailable(_)));
        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn enrich_resolves_websites_by_detail_link() {
        let bella_listing = format!("<html><body>{}</body></html>", panel("Bella", "+5511", Some(FORM_SITE)));
        let browser = scripted_browser().with_page(&link("bella"), "", &bella_listing);
        let config = test_config();
        let candidates = vec![
            CandidateListing {
                name: "Sem Link".to_string(),
                rating: Some(4.1),
                review_count: 2,
                detail_link: String::new(),
                phone: None,
            },
            CandidateListing {
                name: "Bella".to_string(),
                rating: None,
                review_count: 120,
                detail_link: link("bella"),
                phone: Some("+55 11 3000-0001".to_string()),
            },
        ];

        let leads = enrich(&browser, &config, candidates).await.unwrap();

        assert_eq!(leads[0].candidate.name, "Bella");
        assert_eq!(leads[0].candidate.phone.as_deref(), Some("+55 11 3000-0001"));
        assert_eq!(leads[0].diagnosis, Diagnosis::HighFriction);
        assert_eq!(leads[1].candidate.name, "Sem Link");
        assert_eq!(leads[1].diagnosis, Diagnosis::NoWebsite);
        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn summary_lists_top_leads_only() {
        let browser = scripted_browser();
        let config = test_config();
        let leads = run(&browser, &config).await.unwrap();

        let lines = summary(&leads, 2);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. Bella | score 10 | High friction | Botox"));
        assert!(lines[1].starts_with("2. Nova Pele"));
    }
}
