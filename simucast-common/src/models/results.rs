// File: simucast-common/src/models/results.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One answer option and how many viewers picked it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub label: String,
    pub count: u64,
}

/// Aggregate poll/quiz results across every session of the webinar,
/// simulated and live alike.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResults {
    pub interaction_id: Uuid,
    pub tallies: Vec<OptionTally>,
    pub total_responses: u64,
    /// This viewer's own recorded answer, when the endpoint knows it.
    #[serde(default)]
    pub own_response: Option<Value>,
}

impl AggregateResults {
    /// Share of responses that picked option `index`, 0 to 100.
    pub fn percent(&self, index: usize) -> f64 {
        if self.total_responses == 0 {
            return 0.0;
        }
        match self.tallies.get(index) {
            Some(t) => t.count as f64 / self.total_responses as f64 * 100.0,
            None => 0.0,
        }
    }
}
