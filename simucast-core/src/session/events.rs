// File: simucast-core/src/session/events.rs

use serde_json::Value;
use uuid::Uuid;

use simucast_common::models::chat::ChatMessage;
use simucast_common::models::feed::FeedFilter;

use crate::channel::ChannelStatus;
use crate::playback::MediaError;
use crate::results::ResultsSnapshot;

/// Everything the session engine reacts to, funneled through one queue so
/// state changes happen in a single place in arrival order.
#[derive(Debug)]
pub enum EngineEvent {
    /// Playback clock moved.
    MediaTime { position: f64, duration: Option<f64> },
    /// First frame played.
    MediaStarted { position: f64 },
    /// Playback reached the end of the video.
    MediaEnded,
    /// Recovery gave up; playback is over for this session.
    MediaFatal { error: MediaError },
    /// One live message from the realtime room.
    ChatArrived(ChatMessage),
    /// Recent room history delivered right after connecting.
    ChatBacklog(Vec<ChatMessage>),
    /// A scripted-chat window fetch came back for `(.., to]`.
    ChatWindow { to: u32, messages: Vec<ChatMessage> },
    /// A scripted-chat window fetch failed; the cursor may retry.
    ChatWindowFailed,
    ChannelStatus(ChannelStatus),
    ResultsArrived(ResultsSnapshot),
    Command(SessionCommand),
}

/// Viewer-initiated commands, injected into the same queue as media and
/// network events.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Play,
    Pause,
    Dismiss { interaction_id: Uuid },
    Answer { interaction_id: Uuid, response: Value },
    SendChat { text: String },
    SetFilter(FeedFilter),
    EndScreenClicked,
    Shutdown,
}
