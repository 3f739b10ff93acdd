use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;

use card_radar::cli::{format_card_details, format_card_line, format_comparison, parse_list_args, USAGE};
use card_radar::{
    compare_cards, fetches_for_digest, init_logging, list_snapshots, load_cards,
    load_latest_snapshot, recent_fetches, record_fetch, save_snapshot, setup_database, Config,
    FeedSnapshot, FetchEvent, VERSION,
};

const HISTORY_LIMIT: usize = 10;

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("import") => run_import(&config),
        Some("list") => run_list(&config, &args[2..]),
        Some("show") => match args.get(2) {
            Some(id) => run_show(&config, id),
            None => bail!("Usage: card-radar show <id>"),
        },
        Some("compare") => run_compare(&config, &args[2..]),
        Some("history") => match args.get(2) {
            Some(digest) => run_digest_history(&config, digest),
            None => run_history(&config),
        },
        Some("help") | Some("--help") | Some("-h") | None => {
            print!("{}", USAGE);
            Ok(())
        }
        Some(other) => bail!("Unknown command {:?}\n\n{}", other, USAGE),
    }
}

fn open_database(config: &Config) -> Result<Connection> {
    let conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

/// Latest stored snapshot; bundled data when nothing was imported yet
fn current_snapshot(config: &Config) -> Result<FeedSnapshot> {
    if !config.db_path.exists() {
        return Ok(FeedSnapshot::bundled());
    }

    let conn = open_database(config)?;
    Ok(load_latest_snapshot(&conn)?.unwrap_or_else(FeedSnapshot::bundled))
}

fn run_import(config: &Config) -> Result<()> {
    println!("📡 Card Radar v{} - Feed Import", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Fetch
    let source = config.feed_source()?;
    println!("\n📂 Fetching {}...", source.describe());
    let snapshot = load_cards(source.as_ref());

    match &snapshot.fallback_reason {
        None => println!("✓ Loaded {} cards from the live feed", snapshot.cards.len()),
        Some(reason) => {
            println!("⚠️  Live feed unavailable: {}", reason);
            println!("✓ Using {} bundled cards", snapshot.cards.len());
        }
    }

    // 2. Store
    println!("\n💾 Saving snapshot...");
    let conn = open_database(config)?;
    match save_snapshot(&conn, &snapshot)? {
        Some(snapshot_id) => println!("✓ Stored snapshot {}", snapshot_id),
        None => println!("✓ Feed unchanged since the last import (digest {})", short_digest(&snapshot.digest)),
    }

    record_fetch(&conn, &FetchEvent::from_snapshot(&snapshot, &source.describe(), "cli"))?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Import complete");

    Ok(())
}

fn run_list(config: &Config, flags: &[String]) -> Result<()> {
    let (filters, sort) = parse_list_args(flags)?.into_view()?;
    let snapshot = current_snapshot(config)?;

    let cards = card_radar::apply_view(&snapshot.cards, &filters, sort);

    for card in &cards {
        println!("{}", format_card_line(card));
    }
    println!(
        "\n{} of {} cards ({}, sorted by {})",
        cards.len(),
        snapshot.cards.len(),
        snapshot.origin.code(),
        sort.code()
    );

    Ok(())
}

fn run_show(config: &Config, id: &str) -> Result<()> {
    let snapshot = current_snapshot(config)?;

    match snapshot.find(id) {
        Some(card) => {
            println!("{}", format_card_details(card));
            Ok(())
        }
        None => bail!("No card with id {:?}", id),
    }
}

fn run_compare(config: &Config, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        bail!("Usage: card-radar compare <id> <id>...");
    }

    let snapshot = current_snapshot(config)?;
    let comparison = compare_cards(&snapshot.cards, ids);
    println!("{}", format_comparison(&comparison));

    Ok(())
}

/// Database for read-only commands; `None` when nothing was imported yet
fn open_existing_database(config: &Config) -> Result<Option<Connection>> {
    if !config.db_path.exists() {
        println!("❌ No database at {}", config.db_path.display());
        println!("   Run: card-radar import");
        return Ok(None);
    }

    open_database(config).map(Some)
}

fn run_history(config: &Config) -> Result<()> {
    let Some(conn) = open_existing_database(config)? else {
        return Ok(());
    };

    println!("🗄️  Snapshots (newest first)");
    for summary in list_snapshots(&conn, HISTORY_LIMIT)? {
        println!(
            "  {}  {:<8} {:>3} cards  {}",
            summary.fetched_at.format("%Y-%m-%d %H:%M:%S"),
            summary.origin.code(),
            summary.card_count,
            short_digest(&summary.digest)
        );
    }

    println!("\n📜 Fetch events");
    for event in recent_fetches(&conn, HISTORY_LIMIT)? {
        println!("{}", format_fetch(&event));
    }

    Ok(())
}

fn run_digest_history(config: &Config, digest: &str) -> Result<()> {
    let Some(conn) = open_existing_database(config)? else {
        return Ok(());
    };

    let events = fetches_for_digest(&conn, digest)?;
    if events.is_empty() {
        bail!("No fetches served a snapshot with digest {:?}", digest);
    }

    println!("📜 Fetches of snapshot {}", digest);
    for event in &events {
        println!("{}", format_fetch(event));
    }

    Ok(())
}

fn format_fetch(event: &FetchEvent) -> String {
    let mut line = format!(
        "  {}  {:<8} {:<7} {:>3} cards  {}  {}",
        event.recorded_at.format("%Y-%m-%d %H:%M:%S"),
        event.origin.code(),
        event.actor,
        event.card_count,
        short_digest(&event.digest),
        event.source
    );
    if let Some(reason) = &event.reason {
        line.push_str(&format!("  ({})", reason));
    }
    line
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
