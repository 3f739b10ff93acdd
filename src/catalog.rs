// 🗂️ Catalog - current snapshot plus its revalidation window
// Cards are replaced wholesale per refresh, never mutated in place

use crate::card::CardRecord;
use crate::source::{load_cards, FeedSnapshot, FeedSource};
use crate::view::{apply_view, FilterConfig, SortOption};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

pub const DEFAULT_REVALIDATE_SECS: i64 = 3600;

pub struct Catalog {
    snapshot: FeedSnapshot,
    revalidate_after: Duration,
}

impl Catalog {
    pub fn new(snapshot: FeedSnapshot, revalidate_after: Duration) -> Self {
        Catalog {
            snapshot,
            revalidate_after,
        }
    }

    /// First load: one fetch attempt, bundled data if it fails
    pub fn load(source: &dyn FeedSource, revalidate_after: Duration) -> Self {
        Catalog::new(load_cards(source), revalidate_after)
    }

    pub fn snapshot(&self) -> &FeedSnapshot {
        &self.snapshot
    }

    pub fn cards(&self) -> &[CardRecord] {
        &self.snapshot.cards
    }

    pub fn get(&self, id: &str) -> Option<&CardRecord> {
        self.snapshot.find(id)
    }

    pub fn view(&self, filters: &FilterConfig, sort: SortOption) -> Vec<CardRecord> {
        apply_view(&self.snapshot.cards, filters, sort)
    }

    /// Past the representable range means never
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.snapshot
            .fetched_at
            .checked_add_signed(self.revalidate_after)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn replace(&mut self, snapshot: FeedSnapshot) {
        debug!(
            cards = snapshot.cards.len(),
            origin = snapshot.origin.code(),
            "Catalog snapshot replaced"
        );
        self.snapshot = snapshot;
    }

    /// Re-fetch when the window has passed. Returns true if a fetch happened.
    pub fn refresh_if_stale(&mut self, source: &dyn FeedSource, now: DateTime<Utc>) -> bool {
        if !self.is_stale(now) {
            return false;
        }
        self.replace(load_cards(source));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FetchError, SnapshotOrigin};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl FeedSource for CountingSource {
        fn fetch_csv(&self) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("id,name\nfresh,Fresh Card\n".to_string())
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    #[test]
    fn test_fresh_catalog_does_not_refetch() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        let mut catalog = Catalog::new(FeedSnapshot::bundled(), Duration::seconds(3600));
        let fetched_at = catalog.snapshot().fetched_at;

        assert!(!catalog.refresh_if_stale(&source, fetched_at + Duration::seconds(10)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(catalog.snapshot().origin, SnapshotOrigin::Bundled);
    }

    #[test]
    fn test_stale_catalog_refetches_once() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        let mut catalog = Catalog::new(FeedSnapshot::bundled(), Duration::seconds(60));
        let later = catalog.expires_at() + Duration::seconds(1);

        assert!(catalog.is_stale(later));
        assert!(catalog.refresh_if_stale(&source, later));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.cards().len(), 1);
        assert!(catalog.get("fresh").is_some());
    }

    #[test]
    fn test_unrepresentable_window_never_expires() {
        let catalog = Catalog::new(FeedSnapshot::bundled(), Duration::days(365 * 1_000_000));
        let now = catalog.snapshot().fetched_at + Duration::days(1);

        assert_eq!(catalog.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(!catalog.is_stale(now));
    }

    #[test]
    fn test_view_delegates_to_engine() {
        let catalog = Catalog::new(FeedSnapshot::bundled(), Duration::seconds(60));
        let filters = FilterConfig {
            search: "bybit".to_string(),
            ..Default::default()
        };

        let view = catalog.view(&filters, SortOption::Featured);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, "bybit-card");
    }
}
