// File: simucast-common/src/models/feed.rs

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::chat::ChatMessage;
use crate::models::interaction::TriggeredInteraction;

/// One entry of the combined feed the UI renders.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FeedItem {
    Chat(ChatMessage),
    Interaction(TriggeredInteraction),
}

impl FeedItem {
    /// Timeline position used for ordering the feed.
    pub fn effective_timestamp(&self, timeline_origin: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            FeedItem::Chat(msg) => msg.effective_timestamp(timeline_origin),
            FeedItem::Interaction(ti) => {
                timeline_origin + Duration::seconds(ti.definition.trigger_time as i64)
            }
        }
    }

    /// Dedup key: no two feed items may share it.
    pub fn dedup_key(&self) -> (&'static str, String) {
        match self {
            FeedItem::Chat(msg) => ("chat", msg.id.clone()),
            FeedItem::Interaction(ti) => ("interaction", ti.definition.id.to_string()),
        }
    }
}

/// Viewer-selected view over the combined feed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum FeedFilter {
    #[default]
    All,
    ChatOnly,
    WidgetsOnly,
}

impl FeedFilter {
    pub fn admits(&self, item: &FeedItem) -> bool {
        match (self, item) {
            (FeedFilter::All, _) => true,
            (FeedFilter::ChatOnly, FeedItem::Chat(_)) => true,
            (FeedFilter::WidgetsOnly, FeedItem::Interaction(_)) => true,
            _ => false,
        }
    }
}
