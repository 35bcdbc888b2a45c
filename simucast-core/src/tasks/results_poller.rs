// File: simucast-core/src/tasks/results_poller.rs

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::{debug, warn};
use uuid::Uuid;

use simucast_common::models::results::AggregateResults;
use simucast_common::traits::ResultsSource;

use crate::results::ResultsSnapshot;
use crate::session::events::EngineEvent;

/// Polls the shared tally of one answered interaction until shutdown.
///
/// Fetches immediately, then on every interval tick. Errors mark the
/// snapshot stale while keeping the last good numbers; the poller itself
/// never stops on failure.
pub fn spawn_results_poller_task(
    source: Arc<dyn ResultsSource>,
    token: String,
    interaction_id: Uuid,
    poll_interval_ms: u64,
    events_tx: mpsc::Sender<EngineEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("(ResultsPoller) started for interaction {}", interaction_id);
        let mut ticker = interval(Duration::from_millis(poll_interval_ms));
        let mut last_good: Option<AggregateResults> = None;

        loop {
            tokio::select! {
                biased;

                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("(ResultsPoller) shutting down for {}", interaction_id);
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let snapshot = match source.fetch_results(&token, interaction_id).await {
                        Ok(results) => {
                            last_good = Some(results.clone());
                            ResultsSnapshot::fresh(interaction_id, results)
                        }
                        Err(e) => {
                            warn!(
                                "(ResultsPoller) fetch for {} failed: {:?}",
                                interaction_id, e
                            );
                            ResultsSnapshot::failed(interaction_id, last_good.clone(), e.to_string())
                        }
                    };
                    if events_tx
                        .send(EngineEvent::ResultsArrived(snapshot))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
    })
}
