use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use marketplace_tracker::aggregator::{Aggregator, WriteDiscipline};
use marketplace_tracker::api::routes::{router, ApiState};
use marketplace_tracker::config::{Config, ACTIVITY_LOG_CAP, LISTING_CACHE_CAP};
use marketplace_tracker::error::Result;
use marketplace_tracker::store::{KvStore, MemoryStore, SqliteStore};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let discipline = if cfg.serialize_writes {
        WriteDiscipline::Serialized
    } else {
        WriteDiscipline::Unserialized
    };

    // --- Store setup ---
    if cfg.db_path == ":memory:" {
        warn!("DB_PATH=:memory:, data lives only as long as this process and the popup cannot read it directly");
        serve(MemoryStore::new(), discipline, &cfg).await
    } else {
        let store = SqliteStore::open(&cfg.db_path).await?;
        serve(store, discipline, &cfg).await
    }
}

async fn serve<S: KvStore + 'static>(store: S, discipline: WriteDiscipline, cfg: &Config) -> Result<()> {
    let aggregator = Arc::new(Aggregator::new(store, discipline));

    if aggregator.install().await? {
        info!("First install: default settings written");
    }

    let stats = aggregator.get_stats().await;
    info!(
        activities = stats.total_activities,
        listings = stats.total_listings,
        ?discipline,
        "Aggregator ready | log {}/{} | cache {}/{}",
        stats.total_activities,
        ACTIVITY_LOG_CAP,
        stats.total_listings,
        LISTING_CACHE_CAP,
    );
    if discipline == WriteDiscipline::Unserialized {
        info!("Writes are unserialized: overlapping trackActivity calls may lose an update (SERIALIZE_WRITES=1 to serialize)");
    }

    // --- HTTP message interface ---
    let app = router(ApiState { aggregator });
    let bind_addr = format!("127.0.0.1:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Message interface listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
