//! Command-line surface and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::scrapers::MinerConfig;

/// Finds under-served local businesses on Google Maps and ranks them for outreach.
#[derive(Debug, Parser)]
#[command(name = "lead-miner", version, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write the scored leads as pretty JSON to this path.
    #[arg(long, global = true, env = "LEADS_JSON")]
    pub json: Option<PathBuf>,

    /// How many leads to print in the final summary.
    #[arg(long, default_value_t = 5, global = true, env = "LEADS_TOP")]
    pub top: usize,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl the results feed and write the candidate file with phones.
    Mine {
        #[arg(short, long, default_value = "leads_to_call.csv")]
        output: PathBuf,
    },

    /// Enrich, score and rank a previously mined candidate file.
    Enrich {
        #[arg(short, long, default_value = "leads_to_call.csv")]
        input: PathBuf,

        #[arg(short, long, default_value = "leads_prioritized.csv")]
        output: PathBuf,
    },

    /// Crawl, enrich, score and rank in one browser session.
    Run {
        #[arg(short, long, default_value = "leads_prioritized.csv")]
        output: PathBuf,
    },
}

/// Search and browser options shared by every command
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Business category to search for.
    #[arg(long, global = true, env = "LEADS_SEARCH_TERM", default_value = "Clínica de Estética")]
    pub term: String,

    #[arg(long, global = true, env = "LEADS_LOCATION", default_value = "São Paulo, Jardins")]
    pub location: String,

    /// Lowest rating kept (inclusive).
    #[arg(long, global = true, env = "LEADS_MIN_RATING", default_value_t = 3.5)]
    pub min_rating: f64,

    /// Highest rating kept (inclusive).
    #[arg(long, global = true, env = "LEADS_MAX_RATING", default_value_t = 4.8)]
    pub max_rating: f64,

    /// Stop crawling once this many candidates are collected.
    #[arg(long, global = true, env = "LEADS_TARGET", default_value_t = 20)]
    pub target: usize,

    #[arg(long, global = true, env = "LEADS_MAX_SCROLLS", default_value_t = 15)]
    pub max_scrolls: usize,

    /// Upper bound on detail views opened per run.
    #[arg(long, global = true, env = "LEADS_MAX_DETAILS", default_value_t = 20)]
    pub max_details: usize,

    /// Longest wait for new content after a scroll, click or page load.
    #[arg(long, global = true, env = "LEADS_SETTLE_MS", default_value_t = 2000)]
    pub settle_ms: u64,

    #[arg(long, global = true, env = "LEADS_POLL_MS", default_value_t = 250)]
    pub poll_ms: u64,

    #[arg(long, global = true, env = "LEADS_FEED_TIMEOUT_SECS", default_value_t = 10)]
    pub feed_timeout_secs: u64,

    #[arg(long, global = true, env = "LEADS_NAV_TIMEOUT_SECS", default_value_t = 15)]
    pub nav_timeout_secs: u64,

    /// Pixels scrolled per pass.
    #[arg(long, global = true, env = "LEADS_SCROLL_STEP", default_value_t = 1000)]
    pub scroll_step: i64,

    /// Show the browser window.
    #[arg(long, global = true, env = "LEADS_HEADED")]
    pub headed: bool,

    /// Where to save the feed HTML when a crawl finds nothing.
    #[arg(long, global = true, env = "LEADS_DEBUG_DIR")]
    pub debug_dir: Option<PathBuf>,
}

impl SearchArgs {
    pub fn to_config(&self) -> MinerConfig {
        MinerConfig {
            search_term: self.term.clone(),
            location: self.location.clone(),
            min_rating: self.min_rating,
            max_rating: self.max_rating,
            target_count: self.target,
            max_scroll_iterations: self.max_scrolls,
            max_details: self.max_details,
            settle_delay: Duration::from_millis(self.settle_ms),
            settle_poll_interval: Duration::from_millis(self.poll_ms),
            feed_timeout: Duration::from_secs(self.feed_timeout_secs),
            navigation_timeout: Duration::from_secs(self.nav_timeout_secs),
            scroll_step: self.scroll_step,
            headless: !self.headed,
            debug_dir: self.debug_dir.clone(),
        }
    }
}

pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => "lead_miner=info",
        1 => "lead_miner=debug",
        _ => "lead_miner=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt().with_env_filter(env_filter).with_target(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_miner_config() {
        let cli = Cli::try_parse_from(["lead-miner", "mine"]).unwrap();
        let config = cli.search.to_config();
        let defaults = MinerConfig::default();

        assert_eq!(config.search_term, defaults.search_term);
        assert_eq!(config.location, defaults.location);
        assert_eq!(config.min_rating, defaults.min_rating);
        assert_eq!(config.max_rating, defaults.max_rating);
        assert_eq!(config.target_count, defaults.target_count);
        assert_eq!(config.max_scroll_iterations, defaults.max_scroll_iterations);
        assert_eq!(config.max_details, defaults.max_details);
        assert_eq!(config.settle_delay, defaults.settle_delay);
        assert_eq!(config.settle_poll_interval, defaults.settle_poll_interval);
        assert_eq!(config.feed_timeout, defaults.feed_timeout);
        assert_eq!(config.navigation_timeout, defaults.navigation_timeout);
        assert_eq!(config.scroll_step, defaults.scroll_step);
        assert_eq!(config.headless, defaults.headless);
        assert_eq!(config.debug_dir, defaults.debug_dir);
        assert_eq!(cli.top, 5);
    }

    #[test]
    fn enrich_takes_input_and_output_paths() {
        let cli = Cli::try_parse_from([
            "lead-miner",
            "enrich",
            "--input",
            "mined.csv",
            "--min-rating",
            "4",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.search.to_config().min_rating, 4.0);
        match cli.command {
            Command::Enrich { input, output } => {
                assert_eq!(input, PathBuf::from("mined.csv"));
                assert_eq!(output, PathBuf::from("leads_prioritized.csv"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn headed_flag_disables_headless() {
        let cli = Cli::try_parse_from(["lead-miner", "run", "--headed"]).unwrap();
        assert!(!cli.search.to_config().headless);
    }
}
