//! Outreach priority: an additive 0-10 score plus a one-line diagnosis.

use chrono::Utc;

use crate::models::{
    CandidateListing, Diagnosis, EnrichmentResult, SchedulingChannel, ScoredLead, ServiceTier,
};

pub const MAX_SCORE: u8 = 10;

/// Rating from which a lead without direct messaging earns a bonus.
const WELL_RATED: f64 = 4.0;

fn tier_points(tier: ServiceTier) -> u8 {
    match tier {
        ServiceTier::High => 5,
        ServiceTier::Mid => 2,
        ServiceTier::None => 0,
    }
}

/// Harder booking means more room to help.
fn friction_points(channel: SchedulingChannel) -> u8 {
    match channel {
        SchedulingChannel::WebForm | SchedulingChannel::None => 5,
        SchedulingChannel::DirectMessaging => 1,
    }
}

pub fn score(candidate: &CandidateListing, enrichment: &EnrichmentResult) -> u8 {
    let mut total = tier_points(enrichment.service_tier)
        + friction_points(enrichment.scheduling_channel);

    if enrichment.broken_link {
        total += 2;
    }

    let well_rated = candidate.rating.is_some_and(|r| r >= WELL_RATED);
    if well_rated && !enrichment.has_direct_messaging {
        total += 2;
    }

    total.min(MAX_SCORE)
}

/// First matching rule wins: broken, no website, form, no booking, fine.
pub fn diagnose(website: Option<&str>, enrichment: &EnrichmentResult) -> Diagnosis {
    if enrichment.broken_link {
        Diagnosis::BrokenLink
    } else if website.is_none() {
        Diagnosis::NoWebsite
    } else {
        match enrichment.scheduling_channel {
            SchedulingChannel::WebForm => Diagnosis::HighFriction,
            SchedulingChannel::None => Diagnosis::NoBooking,
            SchedulingChannel::DirectMessaging => Diagnosis::WellStructured,
        }
    }
}

pub fn score_lead(
    candidate: CandidateListing,
    website: Option<String>,
    enrichment: EnrichmentResult,
) -> ScoredLead {
    ScoredLead {
        score: score(&candidate, &enrichment),
        diagnosis: diagnose(website.as_deref(), &enrichment),
        candidate,
        website,
        enrichment,
        scored_at: Utc::now(),
    }
}

/// Highest score first; equal scores keep their discovery order.
pub fn rank(leads: &mut [ScoredLead]) {
    leads.sort_by(|a, b| b.score.cmp(&a.score));
}
