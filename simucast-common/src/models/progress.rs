// File: simucast-common/src/models/progress.rs

use serde::{Deserialize, Serialize};

/// Why a progress report was sent.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressEventType {
    /// Periodic report while watching.
    Heartbeat,
    /// The one report sent when the session ends or the viewer leaves.
    Final,
}

/// Watch-progress payload for the progress endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    /// Playback position in seconds.
    pub position: f64,
    /// Percent of the recording watched, 0 to 100.
    pub progress: f64,
    pub event_type: ProgressEventType,
}

/// What the session amounted to, attached to the leave event.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub final_position: f64,
    /// Set when playback ended naturally or nearly the whole recording
    /// was watched.
    pub completed: bool,
    /// Wall-clock seconds the viewer spent in the session.
    pub watched_seconds: f64,
}

/// Session lifecycle events for the analytics endpoint.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "eventType", content = "metadata", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyticsEvent {
    Joined,
    Left(SessionSummary),
    EndScreenViewed,
    EndScreenClicked,
}

impl AnalyticsEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            AnalyticsEvent::Joined => "JOINED",
            AnalyticsEvent::Left(_) => "LEFT",
            AnalyticsEvent::EndScreenViewed => "END_SCREEN_VIEWED",
            AnalyticsEvent::EndScreenClicked => "END_SCREEN_CLICKED",
        }
    }
}
