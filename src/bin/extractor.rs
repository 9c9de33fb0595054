use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::time::interval;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use marketplace_tracker::client::AggregatorClient;
use marketplace_tracker::config::Config;
use marketplace_tracker::error::Result;
use marketplace_tracker::extractor::fetcher::{fetch_page, page_client};
use marketplace_tracker::extractor::{PageTracker, Trigger};
use marketplace_tracker::types::{now_ms, TrackEvent};

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
    let cooldown = Duration::from_millis(cfg.extract_cooldown_ms);
    let mut trackers: Vec<PageTracker> = Vec::new();
    for url in &cfg.track_urls {
        match PageTracker::for_url(url, cooldown, cfg.extract_limit) {
            Some(t) => {
                info!(url = %url, marketplace = %t.marketplace(), "Tracking page");
                trackers.push(t);
            }
            None => warn!(url = %url, "Not a tracked marketplace page, skipping"),
        }
    }
    if trackers.is_empty() {
        warn!("TRACK_URLS has no marketplace pages. Example: TRACK_URLS=https://www.ebay.com/sch/i.html?_nkw=lamp,https://www.avito.ru/moskva");
        return Ok(());
    }

    let pages = page_client()?;
    let client = AggregatorClient::new(cfg.aggregator_url.clone())?;

    let mut ticker = interval(Duration::from_secs(cfg.extract_poll_secs.max(1)));
    // Fetched pages carry no user input, so clicks never fire from here.
    let mut trigger = Trigger::PageLoad;
    loop {
        ticker.tick().await;

        let bodies = join_all(trackers.iter().map(|t| fetch_page(&pages, t.url()))).await;

        let now = Instant::now();
        let now_ms = now_ms();
        let mut events: Vec<TrackEvent> = Vec::new();
        for (tracker, body) in trackers.iter_mut().zip(bodies) {
            match body {
                Ok(html) => events.extend(tracker.observe(trigger, &html, now, now_ms)),
                Err(e) => warn!(url = %tracker.url(), "Page fetch failed: {e}"),
            }
        }

        // Failed sends are logged by the client and dropped.
        for resp in join_all(events.into_iter().map(|e| client.track_activity(e))).await.into_iter().flatten() {
            info!(
                event = "ACTIVITY_SENT",
                accepted = resp.accepted,
                total = resp.total_activities,
            );
        }

        trigger = Trigger::Scroll;
    }
}
