use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for a responsible party or service that could not be found.
pub const NOT_IDENTIFIED: &str = "not identified";

/// Sentinel phone value when the detail view yielded nothing.
pub const PHONE_UNAVAILABLE: &str = "unavailable";

/// One business row discovered in the results feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateListing {
    pub name: String,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub detail_link: String,
    pub phone: Option<String>,
}

impl CandidateListing {
    /// Phone for display and export, falling back to the sentinel.
    pub fn phone_or_sentinel(&self) -> &str {
        self.phone.as_deref().unwrap_or(PHONE_UNAVAILABLE)
    }
}

/// How a prospective customer can book through the website
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingChannel {
    DirectMessaging,
    WebForm,
    #[default]
    None,
}

impl fmt::Display for SchedulingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DirectMessaging => "Direct messaging",
            Self::WebForm => "Web form",
            Self::None => "No online booking",
        };
        f.write_str(label)
    }
}

/// Coarse ticket size of the primary service offered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceTier {
    #[default]
    None,
    Mid,
    High,
}

/// Signals derived from a candidate's public website
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub responsible_party: String,
    pub primary_service: String,
    pub scheduling_channel: SchedulingChannel,
    pub has_direct_messaging: bool,
    pub has_web_form: bool,
    pub broken_link: bool,
    pub service_tier: ServiceTier,
}

impl Default for EnrichmentResult {
    fn default() -> Self {
        Self {
            responsible_party: NOT_IDENTIFIED.to_string(),
            primary_service: NOT_IDENTIFIED.to_string(),
            scheduling_channel: SchedulingChannel::None,
            has_direct_messaging: false,
            has_web_form: false,
            broken_link: false,
            service_tier: ServiceTier::None,
        }
    }
}

/// Outreach verdict attached to every scored lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnosis {
    BrokenLink,
    NoWebsite,
    HighFriction,
    NoBooking,
    WellStructured,
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BrokenLink => "Broken link",
            Self::NoWebsite => "No website",
            Self::HighFriction => "High friction",
            Self::NoBooking => "No booking",
            Self::WellStructured => "Well structured",
        };
        f.write_str(label)
    }
}

/// Terminal record: candidate, its website signals and the computed priority
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLead {
    pub candidate: CandidateListing,
    pub website: Option<String>,
    pub enrichment: EnrichmentResult,
    pub score: u8,
    pub diagnosis: Diagnosis,
    pub scored_at: DateTime<Utc>,
}
