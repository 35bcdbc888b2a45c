// File: simucast-common/src/models/session.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AccessError;
use crate::models::interaction::InteractionDefinition;

/// How a webinar session came to exist. The wire uses SCREAMING_SNAKE_CASE.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    /// Fixed wall-clock start published in advance.
    Scheduled,
    /// Starts the moment the viewer registers.
    JustInTime,
    /// Starts whenever the viewer opens it.
    OnDemand,
    /// A re-watch of a session that already ran.
    Replay,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Scheduled => write!(f, "SCHEDULED"),
            SessionType::JustInTime => write!(f, "JUST_IN_TIME"),
            SessionType::OnDemand => write!(f, "ON_DEMAND"),
            SessionType::Replay => write!(f, "REPLAY"),
        }
    }
}

impl FromStr for SessionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SCHEDULED" => Ok(SessionType::Scheduled),
            "JUST_IN_TIME" => Ok(SessionType::JustInTime),
            "ON_DEMAND" => Ok(SessionType::OnDemand),
            "REPLAY" => Ok(SessionType::Replay),
            _ => Err(format!("Unknown session type: {}", s)),
        }
    }
}

/// Playback discipline for the session.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Locked to the session clock; the viewer cannot scrub behind the
    /// live edge.
    SimulatedLive,
    /// Free playback of the recording.
    Replay,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::SimulatedLive => write!(f, "simulated_live"),
            PlaybackMode::Replay => write!(f, "replay"),
        }
    }
}

/// Static facts about the webinar recording.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WebinarInfo {
    pub webinar_id: Uuid,
    pub title: String,
    /// Total length of the recording, in seconds.
    pub video_duration: f64,
}

/// The playback portion of a granted access payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPlan {
    pub session_type: SessionType,
    pub mode: PlaybackMode,
    pub allow_seeking: bool,
    /// Scheduled wall-clock start. Present for simulated-live sessions.
    pub session_start: Option<DateTime<Utc>>,
    /// Server-computed start offset in seconds, used when no start time
    /// is available.
    pub start_position: f64,
    /// The furthest position the server saw for this viewer, if any.
    pub last_position: Option<f64>,
}

impl PlaybackPlan {
    /// Start offset for a (re)load happening at `now`.
    ///
    /// Simulated-live sessions land on the live edge: elapsed wall-clock
    /// time since the session started, clamped one second short of the end
    /// so the player still has something to render. Seekable sessions
    /// resume from the last watched position; locked replays start over.
    pub fn resolve_start_position(&self, video_duration: f64, now: DateTime<Utc>) -> f64 {
        match self.mode {
            PlaybackMode::SimulatedLive => {
                let elapsed = match self.session_start {
                    Some(start) => (now - start).num_milliseconds() as f64 / 1000.0,
                    None => self.start_position,
                };
                elapsed.max(0.0).min((video_duration - 1.0).max(0.0))
            }
            PlaybackMode::Replay => {
                if self.allow_seeking {
                    self.last_position.unwrap_or(0.0).max(0.0)
                } else {
                    0.0
                }
            }
        }
    }
}

/// Chat configuration from the access payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    pub enabled: bool,
    /// Name the viewer's own messages are published under.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// What to show once playback reaches the natural end.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EndScreen {
    pub headline: String,
    #[serde(default)]
    pub button_label: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Everything the access endpoint hands over when it admits a viewer.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionAccess {
    pub webinar: WebinarInfo,
    pub playback: PlaybackPlan,
    pub interactions: Vec<InteractionDefinition>,
    pub chat: ChatSettings,
    #[serde(default)]
    pub end_screen: Option<EndScreen>,
}

/// Outcome of an access request.
#[derive(Debug, Clone)]
pub enum AccessDecision {
    Granted(Box<SessionAccess>),
    /// Too early for a scheduled session; hold the viewer until then.
    Waiting { starts_at: DateTime<Utc> },
    Denied(AccessError),
}

/// One viewer's resolved playback session. Built once from the granted
/// access payload; read-only afterwards.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub session_id: Uuid,
    /// Viewer access token, passed through to every collaborator call.
    pub token: String,
    pub webinar: WebinarInfo,
    pub session_type: SessionType,
    pub mode: PlaybackMode,
    pub allow_seeking: bool,
    pub session_start: Option<DateTime<Utc>>,
    /// Start offset resolved at session creation.
    pub start_position: f64,
    /// Wall-clock moment this session object came to life.
    pub started_at: DateTime<Utc>,
}

impl PlaybackSession {
    pub fn from_access(token: &str, access: &SessionAccess, now: DateTime<Utc>) -> Self {
        let start_position = access
            .playback
            .resolve_start_position(access.webinar.video_duration, now);
        PlaybackSession {
            session_id: Uuid::new_v4(),
            token: token.to_string(),
            webinar: access.webinar.clone(),
            session_type: access.playback.session_type,
            mode: access.playback.mode,
            allow_seeking: access.playback.allow_seeking,
            session_start: access.playback.session_start,
            start_position,
            started_at: now,
        }
    }

    /// Base instant for mapping timeline offsets onto wall-clock time.
    pub fn timeline_origin(&self) -> DateTime<Utc> {
        self.session_start.unwrap_or(self.started_at)
    }

    /// Percentage of the recording covered by `position`, 0 to 100.
    pub fn percent_at(&self, position: f64) -> f64 {
        if self.webinar.video_duration <= 0.0 {
            return 0.0;
        }
        (position / self.webinar.video_duration * 100.0).clamp(0.0, 100.0)
    }
}
