// ================================================================
// File: simucast-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Uuid error: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("Event bus error: {0}")]
    EventBus(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}

/// Typed refusals from the access endpoint. These are terminal for the
/// current attempt; `retryable()` tells the UI whether trying again later
/// can possibly succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("the session has already ended")]
    SessionEnded,

    #[error("the replay window for this webinar has expired")]
    ReplayExpired,

    #[error("replays are not available for this webinar")]
    ReplayDisabled,

    #[error("access denied: {0}")]
    Denied(String),
}

impl AccessError {
    /// Maps a wire error code onto a typed refusal.
    pub fn from_code(code: &str, detail: Option<&str>) -> Self {
        match code {
            "session_ended" => AccessError::SessionEnded,
            "replay_expired" => AccessError::ReplayExpired,
            "replay_disabled" => AccessError::ReplayDisabled,
            other => AccessError::Denied(
                detail.map(|d| d.to_string()).unwrap_or_else(|| other.to_string()),
            ),
        }
    }

    /// Whether a fresh access request could succeed later. Expired or
    /// disabled replays never come back; an ended session can (a replay
    /// may be granted), and so can a generic denial (wrong token, not
    /// registered yet).
    pub fn retryable(&self) -> bool {
        match self {
            AccessError::SessionEnded => true,
            AccessError::ReplayExpired => false,
            AccessError::ReplayDisabled => false,
            AccessError::Denied(_) => true,
        }
    }
}
