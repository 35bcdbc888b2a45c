// File: simucast-core/src/backend/memory.rs
//
// In-memory collaborators for demos and tests. The backend records every
// report it receives and keeps a live tally per poll/quiz, seeded with
// fake "earlier viewers" and absorbing this viewer's answer like the real
// aggregation endpoint would.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use simucast_common::Error;
use simucast_common::models::chat::ChatMessage;
use simucast_common::models::interaction::InteractionEvent;
use simucast_common::models::progress::{AnalyticsEvent, ProgressReport};
use simucast_common::models::results::{AggregateResults, OptionTally};
use simucast_common::models::session::AccessDecision;
use simucast_common::traits::{
    AccessGate, AnalyticsSink, InteractionSink, ProgressSink, ReplayChatSource, ResultsSource,
};

use crate::session::Collaborators;

/// Hands out a scripted sequence of access decisions, repeating the last
/// one forever. A single-decision gate just always returns it.
pub struct MemoryAccessGate {
    decisions: Mutex<VecDeque<AccessDecision>>,
}

impl MemoryAccessGate {
    pub fn new(decision: AccessDecision) -> Self {
        Self::sequence(vec![decision])
    }

    pub fn sequence(decisions: Vec<AccessDecision>) -> Self {
        MemoryAccessGate {
            decisions: Mutex::new(decisions.into()),
        }
    }
}

#[async_trait]
impl AccessGate for MemoryAccessGate {
    async fn request_access(&self, _token: &str) -> Result<AccessDecision, Error> {
        let mut decisions = self.decisions.lock().unwrap();
        let decision = if decisions.len() > 1 {
            decisions.pop_front()
        } else {
            decisions.front().cloned()
        };
        decision.ok_or_else(|| Error::Session("no access decision configured".to_string()))
    }
}

#[derive(Default)]
struct Recorded {
    progress: Vec<ProgressReport>,
    analytics: Vec<AnalyticsEvent>,
    interaction_events: Vec<(Uuid, InteractionEvent)>,
}

pub struct MemoryBackend {
    recorded: Mutex<Recorded>,
    tallies: Mutex<HashMap<Uuid, AggregateResults>>,
    transcript: Vec<ChatMessage>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            recorded: Mutex::new(Recorded::default()),
            tallies: Mutex::new(HashMap::new()),
            transcript: Vec::new(),
        }
    }

    /// Scripted chat messages served through the replay-chat seam. Offsets
    /// do not need to be sorted.
    pub fn with_transcript(mut self, mut transcript: Vec<ChatMessage>) -> Self {
        transcript.sort_by_key(|m| m.offset_seconds.unwrap_or(0));
        self.transcript = transcript;
        self
    }

    /// Seeds the shared tally for one interaction, as if earlier viewers
    /// had already answered.
    pub fn seed_tally(&self, interaction_id: Uuid, options: Vec<(&str, u64)>) {
        let total = options.iter().map(|(_, n)| *n).sum();
        let tallies = options
            .into_iter()
            .map(|(label, count)| OptionTally {
                label: label.to_string(),
                count,
            })
            .collect();
        self.tallies.lock().unwrap().insert(
            interaction_id,
            AggregateResults {
                interaction_id,
                tallies,
                total_responses: total,
                own_response: None,
            },
        );
    }

    pub fn progress_reports(&self) -> Vec<ProgressReport> {
        self.recorded.lock().unwrap().progress.clone()
    }

    pub fn analytics_events(&self) -> Vec<AnalyticsEvent> {
        self.recorded.lock().unwrap().analytics.clone()
    }

    pub fn interaction_events(&self) -> Vec<(Uuid, InteractionEvent)> {
        self.recorded.lock().unwrap().interaction_events.clone()
    }

    /// Wires every collaborator seam to one shared backend instance.
    pub fn collaborators(backend: &Arc<MemoryBackend>) -> Collaborators {
        Collaborators {
            progress: backend.clone(),
            analytics: backend.clone(),
            interactions: backend.clone(),
            results: backend.clone(),
            replay_chat: backend.clone(),
        }
    }

    fn absorb_answer(&self, interaction_id: Uuid, response: &Value) {
        let mut tallies = self.tallies.lock().unwrap();
        let Some(results) = tallies.get_mut(&interaction_id) else {
            return;
        };
        results.total_responses += 1;
        results.own_response = Some(response.clone());
        if let Some(index) = response.get("optionIndex").and_then(Value::as_u64) {
            if let Some(tally) = results.tallies.get_mut(index as usize) {
                tally.count += 1;
            }
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressSink for MemoryBackend {
    async fn report(&self, _token: &str, report: &ProgressReport) -> Result<(), Error> {
        self.recorded.lock().unwrap().progress.push(report.clone());
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for MemoryBackend {
    async fn track(&self, _token: &str, event: &AnalyticsEvent) -> Result<(), Error> {
        self.recorded.lock().unwrap().analytics.push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl InteractionSink for MemoryBackend {
    async fn submit(
        &self,
        _token: &str,
        interaction_id: Uuid,
        event: &InteractionEvent,
    ) -> Result<(), Error> {
        if let InteractionEvent::Answered { response } = event {
            self.absorb_answer(interaction_id, response);
        }
        self.recorded
            .lock()
            .unwrap()
            .interaction_events
            .push((interaction_id, event.clone()));
        Ok(())
    }
}

#[async_trait]
impl ResultsSource for MemoryBackend {
    async fn fetch_results(
        &self,
        _token: &str,
        interaction_id: Uuid,
    ) -> Result<AggregateResults, Error> {
        self.tallies
            .lock()
            .unwrap()
            .get(&interaction_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no tally for interaction {}", interaction_id)))
    }
}

#[async_trait]
impl ReplayChatSource for MemoryBackend {
    async fn fetch_window(
        &self,
        _token: &str,
        from: u32,
        to: u32,
    ) -> Result<Vec<ChatMessage>, Error> {
        Ok(self
            .transcript
            .iter()
            .filter(|m| {
                m.offset_seconds
                    .map(|offset| offset > from && offset <= to)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_transcript_window_is_half_open() {
        let backend = MemoryBackend::new().with_transcript(vec![
            ChatMessage::simulated("s1", "Host", "first", 10),
            ChatMessage::simulated("s2", "Host", "second", 20),
            ChatMessage::simulated("s3", "Host", "third", 30),
        ]);

        let window = backend.fetch_window("t", 10, 30).await.unwrap();
        assert_eq!(
            window.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["s2", "s3"],
            "lower bound is exclusive, upper bound inclusive"
        );
    }

    #[tokio::test]
    async fn test_answer_moves_the_seeded_tally() {
        let backend = MemoryBackend::new();
        let id = Uuid::new_v4();
        backend.seed_tally(id, vec![("Yes", 12), ("No", 8)]);

        backend
            .submit("t", id, &InteractionEvent::Answered {
                response: json!({"optionIndex": 1}),
            })
            .await
            .unwrap();

        let results = backend.fetch_results("t", id).await.unwrap();
        assert_eq!(results.total_responses, 21);
        assert_eq!(results.tallies[1].count, 9);
        assert_eq!(results.own_response, Some(json!({"optionIndex": 1})));
    }

    #[tokio::test]
    async fn test_unseeded_results_are_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.fetch_results("t", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_gate_sequence_settles_on_last_decision() {
        let gate = MemoryAccessGate::sequence(vec![
            AccessDecision::Waiting {
                starts_at: chrono::Utc::now(),
            },
            AccessDecision::Denied(simucast_common::error::AccessError::ReplayDisabled),
        ]);

        assert!(matches!(
            gate.request_access("t").await.unwrap(),
            AccessDecision::Waiting { .. }
        ));
        assert!(matches!(
            gate.request_access("t").await.unwrap(),
            AccessDecision::Denied(_)
        ));
        assert!(matches!(
            gate.request_access("t").await.unwrap(),
            AccessDecision::Denied(_),
        ));
    }
}
