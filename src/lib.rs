// Card Radar - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod card;
pub mod parser;
pub mod region;
pub mod view;
pub mod source;
pub mod catalog;
pub mod compare;
pub mod db;
pub mod config;
pub mod cli;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use card::{CardRecord, CardType, Cashback, Custody, KycLevel, Network, UnknownVariant};
pub use parser::{bundled_cards, parse_feed, BUNDLED_CARD_COUNT};
pub use region::{known_regions, matches_region, GLOBAL_REGION};
pub use view::{apply_view, FilterConfig, SortOption, ViewRequest, ViewRequestError};
pub use source::{
    load_cards, FeedSnapshot, FeedSource, FetchError, FileFeedSource, HttpFeedSource,
    SnapshotOrigin,
};
pub use catalog::Catalog;
pub use compare::{compare_cards, CompareRow, Comparison, MAX_COMPARE_CARDS};
pub use db::{
    FetchEvent, SnapshotSummary,
    setup_database, save_snapshot, load_latest_snapshot, list_snapshots,
    record_fetch, recent_fetches, fetches_for_digest,
};
pub use config::{Config, ConfigError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the `tracing` subscriber (`RUST_LOG`, default `info`)
///
/// Logs go to stderr so they never mix with CLI output.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
