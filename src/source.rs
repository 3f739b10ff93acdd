// 📡 Feed Loader - one fetch attempt, bundled snapshot on any failure
//
// Sources only produce CSV text. `load_cards` owns the fallback so callers
// always get a usable (possibly stale) record set.

use crate::card::CardRecord;
use crate::parser::{parse_feed, BUNDLED_FEED};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Published spreadsheet export
pub const DEFAULT_FEED_URL: &str =
    "https://docs.google.com/spreadsheets/d/17TiduyQc48IbZkDK0o5o1Sv4ndTbt_qPGyn6DsFTmaA/export?format=csv&gid=1350568727";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("feed responded with HTTP {status}")]
    Status { status: u16 },
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to read feed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// SOURCES
// ============================================================================

/// Where raw feed CSV comes from
pub trait FeedSource: Send + Sync {
    fn fetch_csv(&self) -> Result<String, FetchError>;

    /// Human-readable location for logs and the audit trail
    fn describe(&self) -> String;
}

/// CSV export over HTTP(S), single attempt with a bounded timeout
pub struct HttpFeedSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpFeedSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("card-radar/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(HttpFeedSource {
            url: url.to_string(),
            client,
        })
    }
}

impl FeedSource for HttpFeedSource {
    fn fetch_csv(&self) -> Result<String, FetchError> {
        let response = self.client.get(&self.url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.text()?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Local CSV export, handy offline and in tests
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileFeedSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl FeedSource for FileFeedSource {
    fn fetch_csv(&self) -> Result<String, FetchError> {
        std::fs::read_to_string(&self.path).map_err(|source| FetchError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotOrigin {
    Live,
    Bundled,
}

impl SnapshotOrigin {
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotOrigin::Live => "live",
            SnapshotOrigin::Bundled => "bundled",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "live" => Some(SnapshotOrigin::Live),
            "bundled" => Some(SnapshotOrigin::Bundled),
            _ => None,
        }
    }
}

/// The record set of one refresh cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub cards: Vec<CardRecord>,
    pub origin: SnapshotOrigin,
    pub fetched_at: DateTime<Utc>,
    /// SHA-256 of the CSV text the cards were parsed from
    pub digest: String,
    /// Why the live feed was not used, when it was not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl FeedSnapshot {
    pub fn from_csv(raw: &str, origin: SnapshotOrigin) -> Self {
        FeedSnapshot {
            cards: parse_feed(raw),
            origin,
            fetched_at: Utc::now(),
            digest: compute_digest(raw),
            fallback_reason: None,
        }
    }

    pub fn bundled() -> Self {
        FeedSnapshot::from_csv(BUNDLED_FEED, SnapshotOrigin::Bundled)
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == SnapshotOrigin::Bundled
    }

    pub fn find(&self, id: &str) -> Option<&CardRecord> {
        self.cards.iter().find(|card| card.id == id)
    }
}

pub fn compute_digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// LOADING
// ============================================================================

/// Fetch and parse the live feed, or fall back to the bundled dataset
///
/// Never fails. A feed that parses to zero cards is treated like a failed
/// fetch, since an empty catalog is never a valid snapshot.
pub fn load_cards(source: &dyn FeedSource) -> FeedSnapshot {
    let reason = match source.fetch_csv() {
        Ok(raw) => {
            let snapshot = FeedSnapshot::from_csv(&raw, SnapshotOrigin::Live);
            if !snapshot.cards.is_empty() {
                info!(
                    source = %source.describe(),
                    cards = snapshot.cards.len(),
                    "Loaded live card feed"
                );
                return snapshot;
            }
            "feed contained no cards".to_string()
        }
        Err(e) => e.to_string(),
    };

    warn!(
        source = %source.describe(),
        reason = %reason,
        "Card feed unavailable, using bundled dataset"
    );

    let mut snapshot = FeedSnapshot::bundled();
    snapshot.fallback_reason = Some(reason);
    snapshot
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BUNDLED_CARD_COUNT;
    use std::io::Write;

    /// Canned source for exercising the fallback without a network
    struct StaticSource(Result<String, u16>);

    impl FeedSource for StaticSource {
        fn fetch_csv(&self) -> Result<String, FetchError> {
            match &self.0 {
                Ok(body) => Ok(body.clone()),
                Err(status) => Err(FetchError::Status { status: *status }),
            }
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    #[test]
    fn test_http_500_falls_back_to_bundled() {
        let snapshot = load_cards(&StaticSource(Err(500)));

        assert_eq!(snapshot.origin, SnapshotOrigin::Bundled);
        assert_eq!(snapshot.cards.len(), BUNDLED_CARD_COUNT);
        assert_eq!(
            snapshot.fallback_reason.as_deref(),
            Some("feed responded with HTTP 500")
        );
    }

    #[test]
    fn test_live_feed_is_used_when_available() {
        let csv = "id,name,issuer\nlive-1,Live Card,Live Co\n".to_string();
        let snapshot = load_cards(&StaticSource(Ok(csv.clone())));

        assert_eq!(snapshot.origin, SnapshotOrigin::Live);
        assert_eq!(snapshot.cards.len(), 1);
        assert_eq!(snapshot.digest, compute_digest(&csv));
        assert!(snapshot.fallback_reason.is_none());
        assert!(snapshot.find("live-1").is_some());
    }

    #[test]
    fn test_empty_feed_falls_back_to_bundled() {
        let snapshot = load_cards(&StaticSource(Ok("<html>sign in</html>".to_string())));

        assert!(snapshot.is_fallback());
        assert_eq!(snapshot.cards.len(), BUNDLED_CARD_COUNT);
    }

    #[test]
    fn test_missing_file_falls_back_to_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileFeedSource::new(dir.path().join("missing.csv"));

        let snapshot = load_cards(&source);
        assert!(snapshot.is_fallback());
        assert!(snapshot
            .fallback_reason
            .unwrap()
            .contains("missing.csv"));
    }

    #[test]
    fn test_file_source_reads_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,name,maxCashback").unwrap();
        writeln!(file, "f1,File Card,3%").unwrap();

        let snapshot = load_cards(&FileFeedSource::new(file.path()));
        assert_eq!(snapshot.origin, SnapshotOrigin::Live);
        assert_eq!(snapshot.cards[0].cashback.as_percent(), Some(3.0));
    }

    #[test]
    fn test_unreachable_host_falls_back() {
        // Port 9 on localhost: refused immediately, no real network involved
        let source = HttpFeedSource::new("http://127.0.0.1:9/feed.csv", Duration::from_secs(2)).unwrap();
        let snapshot = load_cards(&source);
        assert!(snapshot.is_fallback());
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(compute_digest("abc"), compute_digest("abc"));
        assert_ne!(compute_digest("abc"), compute_digest("abd"));
        assert_eq!(compute_digest("").len(), 64);
    }

    #[test]
    fn test_origin_codes_round_trip() {
        for origin in [SnapshotOrigin::Live, SnapshotOrigin::Bundled] {
            assert_eq!(SnapshotOrigin::from_code(origin.code()), Some(origin));
        }
        assert_eq!(SnapshotOrigin::from_code("cached"), None);
    }
}
