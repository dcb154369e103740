pub mod browser;
pub mod detail;
pub mod listing;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use browser::ChromeSession;
pub use detail::{DetailResolver, ResolvedCandidate};
pub use listing::ListingCrawler;
pub use traits::{BrowserSession, WaitCondition};
pub use types::MinerConfig;
