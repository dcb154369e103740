//! Pure text and link heuristics applied to a website snapshot.
//!
//! Nothing here touches a browser; every function takes strings returned by
//! [`BrowserSession`](crate::scrapers::BrowserSession) and is deterministic.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::models::{SchedulingChannel, ServiceTier};

/// High-ticket procedures, in tie-break order.
pub const HIGH_TIER_SERVICES: &[&str] = &[
    "implante",
    "harmonização facial",
    "harmonizacao",
    "lipo",
    "lipoaspiração",
    "transplante capilar",
    "rinoplastia",
    "mamoplastia",
    "abdominoplastia",
    "bichectomia",
    "preenchimento",
    "toxina botulínica",
    "botox",
    "fios de sustentação",
    "lifting",
    "sculptra",
    "skinbooster",
    "bioestimulador",
];

/// Mid-ticket procedures, consulted after every high-tier keyword.
pub const MID_TIER_SERVICES: &[&str] = &[
    "peeling",
    "microagulhamento",
    "laser",
    "limpeza de pele",
    "depilação",
];

const MESSAGING_MARKERS: &[&str] = &["wa.me", "whatsapp", "api.whatsapp"];
const SCHEDULING_VERBS: &[&str] = &["agendar", "marcar", "contato", "book", "schedule", "contact"];
const FORM_MARKERS: &[&str] = &["form", "agendamento", "booking"];
const PLACEHOLDER_HREF: &str = "#";

const NAME_WORD: &str = "[a-záàâãéêíóôõúçñ]+";

/// Title and label prefixes that introduce the person in charge, tried in order.
static IDENTITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let name = format!("({NAME_WORD}(?:[ \\t]+{NAME_WORD}){{1,3}})");
    [
        r"\bdr\.?\s+",
        r"\bdra\.?\s+",
        r"\bpropriet[áa]ri[oa]\s*:\s*",
        r"\bfundadora?\s*:\s*",
        r"\bowner\s*:\s*",
        r"\bfounder\s*:\s*",
    ]
    .iter()
    .map(|prefix| Regex::new(&format!("(?i){prefix}{name}")).expect("valid identity regex"))
    .collect()
});

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// An outbound link as rendered on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub href: String,
    pub text: String,
}

impl PageLink {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }
}

/// Every `<a href>` of the document with its visible text.
pub fn page_links(html: &str) -> Vec<PageLink> {
    Html::parse_document(html)
        .select(&ANCHOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let text = a.text().collect::<Vec<_>>().join(" ");
            Some(PageLink::new(href.trim(), text.trim()))
        })
        .collect()
}

/// First person named after a professional title or owner label.
///
/// Patterns are tried in order; within a pattern the first capture longer
/// than three characters wins. Capitalization is kept as written on the page.
pub fn extract_responsible_party(text: &str) -> Option<String> {
    IDENTITY_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .find(|name| name.chars().count() > 3)
            .map(str::to_string)
    })
}

/// Which booking affordances the page links expose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulingSignals {
    pub has_direct_messaging: bool,
    pub has_web_form: bool,
}

impl SchedulingSignals {
    pub fn channel(&self) -> SchedulingChannel {
        if self.has_direct_messaging {
            SchedulingChannel::DirectMessaging
        } else if self.has_web_form {
            SchedulingChannel::WebForm
        } else {
            SchedulingChannel::None
        }
    }
}

pub fn is_direct_messaging(link: &PageLink) -> bool {
    let href = link.href.to_lowercase();
    MESSAGING_MARKERS.iter().any(|marker| href.contains(marker))
}

/// A scheduling verb in the text and a form-like (or placeholder) target.
pub fn is_web_form(link: &PageLink) -> bool {
    let text = link.text.to_lowercase();
    if !SCHEDULING_VERBS.iter().any(|verb| text.contains(verb)) {
        return false;
    }
    let href = link.href.to_lowercase();
    href == PLACEHOLDER_HREF || FORM_MARKERS.iter().any(|marker| href.contains(marker))
}

pub fn detect_scheduling(links: &[PageLink]) -> SchedulingSignals {
    SchedulingSignals {
        has_direct_messaging: links.iter().any(is_direct_messaging),
        has_web_form: links.iter().any(is_web_form),
    }
}

/// The most mentioned service keyword and its tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMatch {
    pub keyword: &'static str,
    pub occurrences: usize,
    pub tier: ServiceTier,
}

impl ServiceMatch {
    /// Keyword with its first letter upper-cased, e.g. "Botox".
    pub fn display_name(&self) -> String {
        let mut chars = self.keyword.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Picks the keyword with the most occurrences in `text`.
///
/// High-tier keywords are counted before mid-tier ones and a later keyword
/// only replaces the current best with a strictly higher count, so ties go
/// to whichever keyword comes first in [`HIGH_TIER_SERVICES`] then
/// [`MID_TIER_SERVICES`].
pub fn classify_service(text: &str) -> Option<ServiceMatch> {
    let text = text.to_lowercase();
    let tiered = HIGH_TIER_SERVICES
        .iter()
        .map(|kw| (*kw, ServiceTier::High))
        .chain(MID_TIER_SERVICES.iter().map(|kw| (*kw, ServiceTier::Mid)));

    let mut best: Option<ServiceMatch> = None;
    for (keyword, tier) in tiered {
        let occurrences = text.matches(keyword).count();
        if occurrences == 0 {
            continue;
        }
        if best.as_ref().map_or(true, |b| occurrences > b.occurrences) {
            best = Some(ServiceMatch {
                keyword,
                occurrences,
                tier,
            });
        }
    }
    best
}
