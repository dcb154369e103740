use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Marker Chrome puts in every network-level failure message.
const NETWORK_ERROR_MARKER: &str = "net::ERR";

/// Failures reported by a [`BrowserSession`](crate::scrapers::BrowserSession).
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("no element matches selector {0}")]
    ElementNotFound(String),

    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("browser task failed: {0}")]
    Task(String),
}

impl BrowserError {
    /// Builds a navigation error, promoting it to [`BrowserError::Network`]
    /// when the underlying message is a Chrome network failure.
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.contains(NETWORK_ERROR_MARKER) {
            Self::Network(reason)
        } else {
            Self::Navigation {
                url: url.into(),
                reason,
            }
        }
    }

    /// True for DNS, connection and TLS failures, i.e. the site is unreachable.
    pub fn is_network_class(&self) -> bool {
        match self {
            Self::Network(_) => true,
            other => other.to_string().contains(NETWORK_ERROR_MARKER),
        }
    }

    /// True when a page could not be loaded at all. Timeouts do not count:
    /// a slow site is not a broken one.
    pub fn is_navigation_failure(&self) -> bool {
        matches!(self, Self::Navigation { .. }) || self.is_network_class()
    }
}

/// Errors surfaced by the pipeline stages.
///
/// Only [`PipelineError::FeedUnavailable`] is raised from inside a crawl;
/// per-candidate problems are absorbed into default values.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("results feed never became available: {0}")]
    FeedUnavailable(#[source] BrowserError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CSV error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("input file is missing required column {0:?}")]
    MissingColumn(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
