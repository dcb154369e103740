//! CSV files exchanged between the pipeline stages, plus the JSON dump.
//!
//! Every field is quoted and missing values are written as explicit
//! placeholders, never as empty cells.

use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PipelineError;
use crate::models::{CandidateListing, ScoredLead, PHONE_UNAVAILABLE};

pub const CANDIDATE_COLUMNS: [&str; 5] = ["Name", "Phone", "Rating", "ReviewCount", "DetailLink"];

pub const LEAD_COLUMNS: [&str; 11] = [
    "Name",
    "Phone",
    "Rating",
    "ReviewCount",
    "Website",
    "ResponsibleParty",
    "PrimaryService",
    "SchedulingChannel",
    "Score",
    "Diagnosis",
    "DetailLink",
];

pub const WEBSITE_NOT_FOUND: &str = "not found";
pub const RATING_UNAVAILABLE: &str = "n/a";
pub const DETAIL_LINK_UNAVAILABLE: &str = "no link";

/// One row of the candidate file as written by `mine`
#[derive(Debug, Serialize, Deserialize)]
struct CandidateRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Phone")]
    phone: String,
    #[serde(rename = "Rating")]
    rating: String,
    #[serde(rename = "ReviewCount")]
    review_count: String,
    #[serde(rename = "DetailLink")]
    detail_link: String,
}

impl From<CandidateRow> for CandidateListing {
    fn from(row: CandidateRow) -> Self {
        let phone = row.phone.trim();
        let phone = (!phone.is_empty() && phone != PHONE_UNAVAILABLE).then(|| phone.to_string());
        let detail_link = match row.detail_link.trim() {
            DETAIL_LINK_UNAVAILABLE => String::new(),
            link => link.to_string(),
        };

        Self {
            name: row.name.trim().to_string(),
            rating: parse_rating_cell(&row.rating),
            review_count: row.review_count.trim().parse().unwrap_or(0),
            detail_link,
            phone,
        }
    }
}

/// Absent when the cell is empty, a placeholder or otherwise not a number.
fn parse_rating_cell(cell: &str) -> Option<f64> {
    cell.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite())
}

fn format_rating(rating: Option<f64>) -> String {
    rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| RATING_UNAVAILABLE.to_string())
}

fn format_detail_link(link: &str) -> String {
    if link.is_empty() {
        DETAIL_LINK_UNAVAILABLE.to_string()
    } else {
        link.to_string()
    }
}

fn candidate_record(candidate: &CandidateListing) -> [String; 5] {
    [
        candidate.name.clone(),
        candidate.phone_or_sentinel().to_string(),
        format_rating(candidate.rating),
        candidate.review_count.to_string(),
        format_detail_link(&candidate.detail_link),
    ]
}

fn lead_record(lead: &ScoredLead) -> [String; 11] {
    let c = &lead.candidate;
    let e = &lead.enrichment;
    [
        c.name.clone(),
        c.phone_or_sentinel().to_string(),
        format_rating(c.rating),
        c.review_count.to_string(),
        lead.website.clone().unwrap_or_else(|| WEBSITE_NOT_FOUND.to_string()),
        e.responsible_party.clone(),
        e.primary_service.clone(),
        e.scheduling_channel.to_string(),
        lead.score.to_string(),
        lead.diagnosis.to_string(),
        format_detail_link(&c.detail_link),
    ]
}

fn write_rows<const N: usize>(
    path: &Path,
    header: [&str; N],
    rows: impl Iterator<Item = [String; N]>,
) -> Result<(), PipelineError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    writer
        .write_record(header)
        .map_err(|e| PipelineError::csv(path, e))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| PipelineError::csv(path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))
}

pub fn write_candidates(path: &Path, candidates: &[CandidateListing]) -> Result<(), PipelineError> {
    write_rows(path, CANDIDATE_COLUMNS, candidates.iter().map(candidate_record))?;
    info!("💾 Saved {} candidates to {}", candidates.len(), path.display());
    Ok(())
}

/// Writes already ranked leads in their given order.
pub fn write_leads(path: &Path, leads: &[ScoredLead]) -> Result<(), PipelineError> {
    write_rows(path, LEAD_COLUMNS, leads.iter().map(lead_record))?;
    info!("💾 Saved {} leads to {}", leads.len(), path.display());
    Ok(())
}

/// Reads a candidate file. Header names are exact and case-sensitive; extra
/// columns are ignored.
pub fn read_candidates(path: &Path) -> Result<Vec<CandidateListing>, PipelineError> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .clone();
    if let Some(missing) = CANDIDATE_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(PipelineError::MissingColumn(missing.to_string()));
    }

    let mut candidates = Vec::new();
    for row in reader.deserialize::<CandidateRow>() {
        let row = row.map_err(|e| PipelineError::csv(path, e))?;
        candidates.push(CandidateListing::from(row));
    }
    Ok(candidates)
}

pub async fn write_json(path: &Path, leads: &[ScoredLead]) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(leads)
        .map_err(|e| PipelineError::io(path, std::io::Error::other(e)))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    info!("💾 Saved {} leads as JSON to {}", leads.len(), path.display());
    Ok(())
}
