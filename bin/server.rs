// Card Radar - Web Server
// JSON API over the shared card catalog

use anyhow::{Context, Result};
use card_radar::api::{router, AppState};
use card_radar::{
    init_logging, load_cards, load_latest_snapshot, record_fetch, save_snapshot, setup_database,
    Catalog, Config, FeedSource, FetchEvent, VERSION,
};
use rusqlite::Connection;
use std::sync::Arc;
use tracing::info;

/// Open the store and seed the catalog: last stored snapshot, or one fetch
fn build_state(config: Config) -> Result<AppState> {
    let source: Arc<dyn FeedSource> = Arc::from(config.feed_source()?);

    let conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    setup_database(&conn)?;

    let snapshot = match load_latest_snapshot(&conn)? {
        Some(stored) => {
            info!(
                cards = stored.cards.len(),
                fetched_at = %stored.fetched_at,
                "Seeded catalog from stored snapshot"
            );
            stored
        }
        None => {
            let fetched = load_cards(source.as_ref());
            save_snapshot(&conn, &fetched)?;
            record_fetch(&conn, &FetchEvent::from_snapshot(&fetched, &source.describe(), "server"))?;
            fetched
        }
    };

    let catalog = Catalog::new(snapshot, config.revalidate_after);
    Ok(AppState::new(catalog, source).with_database(conn))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    println!("🌐 Card Radar v{} - Web Server", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();

    // The feed client and SQLite are blocking
    let state = tokio::task::spawn_blocking(move || build_state(config)).await??;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    println!("\n🚀 Server running on http://{}", bind_addr);
    println!("   API: http://{}/api/cards", bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
