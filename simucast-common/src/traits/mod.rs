// File: simucast-common/src/traits/mod.rs
//
// Seams to the upstream collaborators. Every call carries the viewer's
// access token; implementations live in simucast-core (HTTP and in-memory).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;
use crate::models::chat::ChatMessage;
use crate::models::interaction::InteractionEvent;
use crate::models::progress::{AnalyticsEvent, ProgressReport};
use crate::models::results::AggregateResults;
use crate::models::session::AccessDecision;

/// The access endpoint: decides whether a token gets in, and hands over the
/// full session payload when it does.
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn request_access(&self, token: &str) -> Result<AccessDecision, Error>;
}

/// The watch-progress endpoint.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, token: &str, report: &ProgressReport) -> Result<(), Error>;
}

/// The analytics endpoint for session lifecycle events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn track(&self, token: &str, event: &AnalyticsEvent) -> Result<(), Error>;
}

/// The interaction-response endpoint: viewed/dismissed/answered records.
#[async_trait]
pub trait InteractionSink: Send + Sync {
    async fn submit(
        &self,
        token: &str,
        interaction_id: Uuid,
        event: &InteractionEvent,
    ) -> Result<(), Error>;
}

/// The results endpoint for shared poll/quiz tallies.
#[async_trait]
pub trait ResultsSource: Send + Sync {
    async fn fetch_results(
        &self,
        token: &str,
        interaction_id: Uuid,
    ) -> Result<AggregateResults, Error>;
}

/// The scripted-transcript endpoint. Returns messages whose timeline
/// offsets fall in `(from, to]` seconds.
#[async_trait]
pub trait ReplayChatSource: Send + Sync {
    async fn fetch_window(&self, token: &str, from: u32, to: u32)
        -> Result<Vec<ChatMessage>, Error>;
}
