// File: simucast-core/src/results/mod.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use simucast_common::models::results::AggregateResults;

/// Latest known state of one interaction's shared tally. A failed fetch
/// keeps the previous numbers and flags the error; the poller never stops.
#[derive(Debug, Clone)]
pub struct ResultsSnapshot {
    pub interaction_id: Uuid,
    pub results: Option<AggregateResults>,
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl ResultsSnapshot {
    pub fn fresh(interaction_id: Uuid, results: AggregateResults) -> Self {
        ResultsSnapshot {
            interaction_id,
            results: Some(results),
            error: None,
            fetched_at: Utc::now(),
        }
    }

    pub fn failed(
        interaction_id: Uuid,
        stale: Option<AggregateResults>,
        error: impl Into<String>,
    ) -> Self {
        ResultsSnapshot {
            interaction_id,
            results: stale,
            error: Some(error.into()),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.error.is_some()
    }
}
