// 🗄️ Snapshot Store - SQLite persistence for feed snapshots
// Snapshots are deduplicated by content digest; every fetch lands in `fetch_events`

use crate::card::CardRecord;
use crate::source::{FeedSnapshot, SnapshotOrigin};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

// ============================================================================
// TYPES
// ============================================================================

/// Row of the `snapshots` table without its cards
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub snapshot_id: String,
    pub digest: String,
    pub origin: SnapshotOrigin,
    pub fetched_at: DateTime<Utc>,
    pub card_count: i64,
    pub fallback_reason: Option<String>,
}

/// One load attempt: where it read from and what it ended up serving
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchEvent {
    pub event_id: String,
    pub recorded_at: DateTime<Utc>,
    pub origin: SnapshotOrigin,
    /// Digest of the snapshot that was served
    pub digest: String,
    pub source: String,
    pub card_count: i64,
    pub reason: Option<String>,
    /// "cli" or "server"
    pub actor: String,
}

impl FetchEvent {
    pub fn from_snapshot(snapshot: &FeedSnapshot, source: &str, actor: &str) -> Self {
        FetchEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            recorded_at: Utc::now(),
            origin: snapshot.origin,
            digest: snapshot.digest.clone(),
            source: source.to_string(),
            card_count: snapshot.cards.len() as i64,
            reason: snapshot.fallback_reason.clone(),
            actor: actor.to_string(),
        }
    }
}

/// Fixed-width RFC 3339 so that text ordering equals time ordering
fn to_sortable(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_sortable(text: &str, what: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("Bad timestamp on {}", what))?
        .with_timezone(&Utc))
}

fn origin_from_code(code: &str) -> Result<SnapshotOrigin> {
    SnapshotOrigin::from_code(code).ok_or_else(|| anyhow!("Unknown snapshot origin {:?}", code))
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            snapshot_id TEXT UNIQUE NOT NULL,
            digest TEXT UNIQUE NOT NULL,
            origin TEXT NOT NULL,
            fetched_at TEXT NOT NULL,
            card_count INTEGER NOT NULL,
            fallback_reason TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshot_cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            snapshot_id TEXT NOT NULL REFERENCES snapshots(snapshot_id),
            position INTEGER NOT NULL,
            card_id TEXT NOT NULL,
            data TEXT NOT NULL,
            UNIQUE (snapshot_id, card_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fetch_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            recorded_at TEXT NOT NULL,
            origin TEXT NOT NULL,
            digest TEXT NOT NULL,
            source TEXT NOT NULL,
            card_count INTEGER NOT NULL,
            reason TEXT,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshot_cards ON snapshot_cards(snapshot_id, position)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_fetched_at ON snapshots(fetched_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fetch_events_digest ON fetch_events(digest)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

/// Store a snapshot and its cards
///
/// Returns the new snapshot id, or `None` when a snapshot with the same
/// digest is already stored. In that case the stored row takes over this
/// fetch's time and origin if it is newer, so it counts as the latest again.
pub fn save_snapshot(conn: &Connection, snapshot: &FeedSnapshot) -> Result<Option<String>> {
    let tx = conn.unchecked_transaction()?;
    let fetched_at = to_sortable(snapshot.fetched_at);

    let existing: Option<String> = tx
        .query_row(
            "SELECT snapshot_id FROM snapshots WHERE digest = ?1",
            params![snapshot.digest],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(snapshot_id) = existing {
        tx.execute(
            "UPDATE snapshots
             SET fetched_at = ?1, origin = ?2, fallback_reason = ?3
             WHERE snapshot_id = ?4 AND fetched_at < ?1",
            params![
                fetched_at,
                snapshot.origin.code(),
                snapshot.fallback_reason,
                snapshot_id,
            ],
        )?;
        tx.commit()?;
        return Ok(None);
    }

    let snapshot_id = uuid::Uuid::new_v4().to_string();

    tx.execute(
        "INSERT INTO snapshots (
            snapshot_id, digest, origin, fetched_at, card_count, fallback_reason
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            snapshot_id,
            snapshot.digest,
            snapshot.origin.code(),
            fetched_at,
            snapshot.cards.len() as i64,
            snapshot.fallback_reason,
        ],
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO snapshot_cards (snapshot_id, position, card_id, data)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        for (position, card) in snapshot.cards.iter().enumerate() {
            let data = serde_json::to_string(card)
                .with_context(|| format!("Failed to serialize card {}", card.id))?;
            stmt.execute(params![snapshot_id, position as i64, card.id, data])?;
        }
    }

    tx.commit()?;
    Ok(Some(snapshot_id))
}

/// Most recently fetched snapshot, cards in feed order
pub fn load_latest_snapshot(conn: &Connection) -> Result<Option<FeedSnapshot>> {
    let summary = match list_snapshots(conn, 1)?.into_iter().next() {
        Some(summary) => summary,
        None => return Ok(None),
    };

    let cards = get_snapshot_cards(conn, &summary.snapshot_id)?;

    Ok(Some(FeedSnapshot {
        cards,
        origin: summary.origin,
        fetched_at: summary.fetched_at,
        digest: summary.digest,
        fallback_reason: summary.fallback_reason,
    }))
}

fn get_snapshot_cards(conn: &Connection, snapshot_id: &str) -> Result<Vec<CardRecord>> {
    let mut stmt = conn.prepare(
        "SELECT card_id, data FROM snapshot_cards
         WHERE snapshot_id = ?1
         ORDER BY position ASC",
    )?;

    let rows = stmt
        .query_map(params![snapshot_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(card_id, data)| {
            serde_json::from_str(&data)
                .with_context(|| format!("Corrupt card {} in snapshot {}", card_id, snapshot_id))
        })
        .collect()
}

/// Newest first, at most `limit` rows
pub fn list_snapshots(conn: &Connection, limit: usize) -> Result<Vec<SnapshotSummary>> {
    let mut stmt = conn.prepare(
        "SELECT snapshot_id, digest, origin, fetched_at, card_count, fallback_reason
         FROM snapshots
         ORDER BY fetched_at DESC, id DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(snapshot_id, digest, origin, fetched_at, card_count, fallback_reason)| {
            Ok(SnapshotSummary {
                origin: origin_from_code(&origin)?,
                fetched_at: from_sortable(&fetched_at, &snapshot_id)?,
                snapshot_id,
                digest,
                card_count,
                fallback_reason,
            })
        })
        .collect()
}

// ============================================================================
// FETCH EVENTS
// ============================================================================

pub fn record_fetch(conn: &Connection, event: &FetchEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO fetch_events (
            event_id, recorded_at, origin, digest, source, card_count, reason, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            event.event_id,
            to_sortable(event.recorded_at),
            event.origin.code(),
            event.digest,
            event.source,
            event.card_count,
            event.reason,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Newest first, at most `limit` rows
pub fn recent_fetches(conn: &Connection, limit: usize) -> Result<Vec<FetchEvent>> {
    query_fetches(
        conn,
        "SELECT event_id, recorded_at, origin, digest, source, card_count, reason, actor
         FROM fetch_events
         ORDER BY recorded_at DESC, id DESC
         LIMIT ?1",
        params![limit as i64],
    )
}

/// Every fetch that served a snapshot whose digest starts with `prefix`
pub fn fetches_for_digest(conn: &Connection, prefix: &str) -> Result<Vec<FetchEvent>> {
    query_fetches(
        conn,
        "SELECT event_id, recorded_at, origin, digest, source, card_count, reason, actor
         FROM fetch_events
         WHERE substr(digest, 1, length(?1)) = ?1
         ORDER BY recorded_at DESC, id DESC",
        params![prefix],
    )
}

fn query_fetches(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<FetchEvent>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map(args, fetch_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(event_id, recorded_at, origin, digest, source, card_count, reason, actor)| {
            Ok(FetchEvent {
                recorded_at: from_sortable(&recorded_at, &event_id)?,
                origin: origin_from_code(&origin)?,
                event_id,
                digest,
                source,
                card_count,
                reason,
                actor,
            })
        })
        .collect()
}

type FetchRow = (String, String, String, String, String, i64, Option<String>, String);

fn fetch_row(row: &Row<'_>) -> rusqlite::Result<FetchRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BUNDLED_CARD_COUNT;
    use chrono::Duration;

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn live(csv: &str, age: Duration) -> FeedSnapshot {
        let mut snapshot = FeedSnapshot::from_csv(csv, SnapshotOrigin::Live);
        snapshot.fetched_at = snapshot.fetched_at - age;
        snapshot
    }

    #[test]
    fn test_save_snapshot_twice_stores_once() {
        let conn = open_test_db();
        let snapshot = FeedSnapshot::bundled();

        let first = save_snapshot(&conn, &snapshot).unwrap();
        let second = save_snapshot(&conn, &snapshot).unwrap();

        assert!(first.is_some(), "First save should insert");
        assert!(second.is_none(), "Same digest should be skipped");
        assert_eq!(list_snapshots(&conn, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_load_latest_snapshot_round_trip() {
        let conn = open_test_db();
        assert!(load_latest_snapshot(&conn).unwrap().is_none());

        let snapshot = FeedSnapshot::bundled();
        save_snapshot(&conn, &snapshot).unwrap();

        let loaded = load_latest_snapshot(&conn).unwrap().unwrap();
        assert_eq!(loaded.cards.len(), BUNDLED_CARD_COUNT);
        assert_eq!(loaded.cards, snapshot.cards);
        assert_eq!(loaded.origin, SnapshotOrigin::Bundled);
        assert_eq!(loaded.digest, snapshot.digest);
    }

    #[test]
    fn test_latest_snapshot_is_newest_fetch() {
        let conn = open_test_db();

        let older = live("id,name\nold,Old Card\n", Duration::hours(2));
        let newer = live("id,name\nnew,New Card\n", Duration::zero());

        save_snapshot(&conn, &newer).unwrap();
        save_snapshot(&conn, &older).unwrap();

        let latest = load_latest_snapshot(&conn).unwrap().unwrap();
        assert_eq!(latest.cards[0].id, "new");

        let history = list_snapshots(&conn, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].card_count, 1);
    }

    #[test]
    fn test_refetched_digest_becomes_latest_again() {
        let conn = open_test_db();
        let csv = "id,name\nlive-1,Live Card\n";

        save_snapshot(&conn, &live(csv, Duration::hours(3))).unwrap();

        let mut fallback = FeedSnapshot::bundled();
        fallback.fetched_at = fallback.fetched_at - Duration::hours(2);
        save_snapshot(&conn, &fallback).unwrap();

        let stored = save_snapshot(&conn, &live(csv, Duration::zero())).unwrap();
        assert!(stored.is_none());

        let latest = load_latest_snapshot(&conn).unwrap().unwrap();
        assert_eq!(latest.origin, SnapshotOrigin::Live);
        assert_eq!(latest.cards.len(), 1);
        assert_eq!(latest.cards[0].id, "live-1");
        assert_eq!(list_snapshots(&conn, 10).unwrap().len(), 2);
    }

    #[test]
    fn test_older_refetch_does_not_move_snapshot_back() {
        let conn = open_test_db();
        let csv = "id,name\nlive-1,Live Card\n";

        let recent = live(csv, Duration::zero());
        save_snapshot(&conn, &recent).unwrap();
        save_snapshot(&conn, &live(csv, Duration::hours(5))).unwrap();

        let summary = list_snapshots(&conn, 1).unwrap().remove(0);
        assert_eq!(to_sortable(summary.fetched_at), to_sortable(recent.fetched_at));
    }

    #[test]
    fn test_fetch_events_record_fallbacks() {
        let conn = open_test_db();
        let mut snapshot = FeedSnapshot::bundled();
        snapshot.fallback_reason = Some("feed responded with HTTP 500".to_string());

        let event = FetchEvent::from_snapshot(&snapshot, "https://example.test/feed.csv", "cli");
        record_fetch(&conn, &event).unwrap();

        let events = recent_fetches(&conn, 5).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].origin, SnapshotOrigin::Bundled);
        assert_eq!(events[0].digest, snapshot.digest);
        assert_eq!(events[0].card_count, BUNDLED_CARD_COUNT as i64);
        assert_eq!(events[0].reason.as_deref(), Some("feed responded with HTTP 500"));
        assert_eq!(events[0].source, "https://example.test/feed.csv");
    }

    #[test]
    fn test_fetches_for_digest_prefix() {
        let conn = open_test_db();
        let live_snapshot = live("id,name\nlive-1,Live Card\n", Duration::zero());
        let bundled = FeedSnapshot::bundled();

        record_fetch(&conn, &FetchEvent::from_snapshot(&live_snapshot, "feed", "server")).unwrap();
        record_fetch(&conn, &FetchEvent::from_snapshot(&bundled, "feed", "server")).unwrap();
        record_fetch(&conn, &FetchEvent::from_snapshot(&live_snapshot, "feed", "cli")).unwrap();

        let events = fetches_for_digest(&conn, &live_snapshot.digest[..12]).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.origin == SnapshotOrigin::Live));
        assert_eq!(recent_fetches(&conn, 10).unwrap().len(), 3);
    }
}
