pub mod dedup;
pub mod driver;
#[cfg(test)]
mod driver_tests;
pub mod enrichment;
pub mod error;
pub mod filter;
pub mod retry;
pub mod sink;
pub mod stats;
pub mod tags;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod verify;

pub use driver::{CrawlSettings, Crawler};
pub use error::{CrawlError, CrawlFailure};
pub use stats::CrawlStats;
