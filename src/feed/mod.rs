pub mod aggregator;
pub mod cache;
pub mod mock;
pub mod normalize;
pub mod provider;
pub mod rapidapi;
pub mod sportmonks;
#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::Aggregator;
pub use provider::build_provider;

use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::{FixtureSnapshot, MatchSnapshot, NewsItem};

/// Up to 10% of `interval`, so several instances don't hit the provider in
/// lockstep.
fn jitter(interval: Duration) -> Duration {
    let max_ms = (interval.as_millis() / 10) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

/// Spawns a background task that refreshes **all three feeds concurrently**
/// every `poll_interval`. The first cycle runs immediately; later ones are
/// delayed by a small random jitter.
///
/// Results reach the page through the aggregator's publish channels; the
/// task itself only drives the refreshes.
pub fn start_poller(aggregator: Aggregator, poll_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Feed poller started (interval={:?})", poll_interval);

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut first = true;
        loop {
            interval.tick().await;
            if !first {
                tokio::time::sleep(jitter(poll_interval)).await;
            }
            first = false;

            let (live, fixtures, news) = tokio::join!(
                aggregator.refresh::<MatchSnapshot>(),
                aggregator.refresh::<FixtureSnapshot>(),
                aggregator.refresh::<NewsItem>(),
            );
            debug!(
                "Poll cycle done: live={} ({}), fixtures={} ({}), news={} ({})",
                live.items.len(),
                live.source,
                fixtures.items.len(),
                fixtures.source,
                news.items.len(),
                news.source
            );
        }
    })
}
