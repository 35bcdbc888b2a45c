// File: simucast-common/src/models/chat.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A chat message, live or scripted. Scripted messages carry a timeline
/// offset instead of a meaningful wall-clock time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Transport-assigned id; the dedup key across feed sources.
    pub id: String,
    pub sender_name: String,
    pub text: String,
    #[serde(default)]
    pub from_moderator: bool,
    /// True for messages replayed from the original session's transcript.
    #[serde(default)]
    pub simulated: bool,
    pub created_at: DateTime<Utc>,
    /// Seconds from session start, for simulated messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_seconds: Option<u32>,
}

impl ChatMessage {
    pub fn live(id: impl Into<String>, sender_name: impl Into<String>, text: impl Into<String>) -> Self {
        ChatMessage {
            id: id.into(),
            sender_name: sender_name.into(),
            text: text.into(),
            from_moderator: false,
            simulated: false,
            created_at: Utc::now(),
            offset_seconds: None,
        }
    }

    pub fn simulated(
        id: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
        offset_seconds: u32,
    ) -> Self {
        ChatMessage {
            id: id.into(),
            sender_name: sender_name.into(),
            text: text.into(),
            from_moderator: false,
            simulated: true,
            created_at: Utc::now(),
            offset_seconds: Some(offset_seconds),
        }
    }

    /// Where this message sits on the feed timeline. Simulated messages map
    /// their offset onto the session clock; live ones keep their arrival
    /// time.
    pub fn effective_timestamp(&self, timeline_origin: DateTime<Utc>) -> DateTime<Utc> {
        match (self.simulated, self.offset_seconds) {
            (true, Some(offset)) => timeline_origin + Duration::seconds(offset as i64),
            _ => self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_message_maps_onto_session_clock() {
        let origin = Utc::now();
        let msg = ChatMessage::simulated("m1", "Host", "welcome", 90);
        assert_eq!(msg.effective_timestamp(origin), origin + Duration::seconds(90));
    }

    #[test]
    fn test_live_message_keeps_arrival_time() {
        let origin = Utc::now() - Duration::seconds(600);
        let msg = ChatMessage::live("m2", "viewer", "hi all");
        assert_eq!(msg.effective_timestamp(origin), msg.created_at);
    }
}
