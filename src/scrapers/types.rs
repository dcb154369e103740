use std::path::PathBuf;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

const SEARCH_BASE_URL: &str = "https://www.google.com/maps/search/";

/// Search and crawl parameters for one mining run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Free-text business category to search for
    pub search_term: String,
    /// Neighbourhood or city appended to the search term
    pub location: String,
    /// Lowest rating kept (inclusive)
    pub min_rating: f64,
    /// Highest rating kept (inclusive)
    pub max_rating: f64,
    /// Stop scrolling once this many unique candidates are collected
    pub target_count: usize,
    /// Hard cap on scroll passes over the feed
    pub max_scroll_iterations: usize,
    /// Upper bound on candidates whose detail view is opened
    pub max_details: usize,
    /// Longest wait for the feed (or a detail view) to settle after an action
    pub settle_delay: Duration,
    /// How often the settle wait re-reads the page
    pub settle_poll_interval: Duration,
    /// Longest wait for the results feed to appear
    pub feed_timeout: Duration,
    /// Per-navigation timeout for detail links and websites
    pub navigation_timeout: Duration,
    /// Pixels scrolled per pagination step
    pub scroll_step: i64,
    /// Run Chrome without a window
    pub headless: bool,
    /// Where to dump the feed HTML when a crawl renders no rows
    pub debug_dir: Option<PathBuf>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            search_term: "Clínica de Estética".to_string(),
            location: "São Paulo, Jardins".to_string(),
            min_rating: 3.5,
            max_rating: 4.8,
            target_count: 20,
            max_scroll_iterations: 15,
            max_details: 20,
            settle_delay: Duration::from_secs(2),
            settle_poll_interval: Duration::from_millis(250),
            feed_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(15),
            scroll_step: 1000,
            headless: true,
            debug_dir: None,
        }
    }
}

impl MinerConfig {
    /// The free-text query sent to the search page.
    pub fn query(&self) -> String {
        format!("{} {}", self.search_term, self.location)
            .trim()
            .to_string()
    }

    pub fn search_url(&self) -> String {
        let query = self.query();
        let encoded = utf8_percent_encode(&query, NON_ALPHANUMERIC);
        format!("{SEARCH_BASE_URL}{encoded}")
    }

    pub fn rating_in_band(&self, rating: f64) -> bool {
        rating >= self.min_rating && rating <= self.max_rating
    }

    /// Number of candidates the detail resolver should visit.
    pub fn detail_budget(&self, available: usize) -> usize {
        self.max_details.min(self.target_count).min(available)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.min_rating > self.max_rating {
            return Err(PipelineError::Config(format!(
                "rating band is inverted: min {} > max {}",
                self.min_rating, self.max_rating
            )));
        }
        if self.target_count == 0 {
            return Err(PipelineError::Config(
                "target count must be at least 1".to_string(),
            ));
        }
        if self.query().is_empty() {
            return Err(PipelineError::Config("search query is empty".to_string()));
        }
        Ok(())
    }
}
