// File: simucast-core/src/feed/merger.rs
//
// Combines the three feed sources into the single list the UI renders:
// scripted transcript windows, live channel messages, and triggered
// interactions. Chat is deduplicated by message id (backlog and live
// delivery overlap routinely); ordering is by effective timestamp, which
// maps scripted offsets onto the session clock.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use simucast_common::models::chat::ChatMessage;
use simucast_common::models::feed::{FeedFilter, FeedItem};
use simucast_common::models::interaction::TriggeredInteraction;

pub struct LiveFeedMerger {
    timeline_origin: DateTime<Utc>,
    filter: FeedFilter,
    chat: Vec<ChatMessage>,
    seen_ids: HashSet<String>,
    interactions: Vec<TriggeredInteraction>,
}

impl LiveFeedMerger {
    pub fn new(timeline_origin: DateTime<Utc>) -> Self {
        LiveFeedMerger {
            timeline_origin,
            filter: FeedFilter::default(),
            chat: Vec::new(),
            seen_ids: HashSet::new(),
            interactions: Vec::new(),
        }
    }

    /// Appends one live message. Returns false for duplicates.
    pub fn push_live(&mut self, msg: ChatMessage) -> bool {
        if !self.seen_ids.insert(msg.id.clone()) {
            return false;
        }
        self.chat.push(msg);
        true
    }

    /// Merges a batch (connect backlog or a transcript window), oldest
    /// first, skipping ids already present. Returns how many were new.
    pub fn push_batch(&mut self, mut batch: Vec<ChatMessage>) -> usize {
        batch.sort_by_key(|m| m.effective_timestamp(self.timeline_origin));
        let mut added = 0;
        for msg in batch {
            if self.seen_ids.insert(msg.id.clone()) {
                self.chat.push(msg);
                added += 1;
            }
        }
        added
    }

    /// Replaces the interaction half of the feed with a fresh projection.
    pub fn set_interactions(&mut self, interactions: Vec<TriggeredInteraction>) {
        self.interactions = interactions;
    }

    pub fn set_filter(&mut self, filter: FeedFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> FeedFilter {
        self.filter
    }

    /// The feed as the UI should render it right now: merged, ordered by
    /// effective timestamp, and narrowed by the current filter.
    pub fn snapshot(&self) -> Vec<FeedItem> {
        let mut items: Vec<FeedItem> = self
            .chat
            .iter()
            .cloned()
            .map(FeedItem::Chat)
            .chain(self.interactions.iter().cloned().map(FeedItem::Interaction))
            .filter(|item| self.filter.admits(item))
            .collect();
        items.sort_by_key(|item| item.effective_timestamp(self.timeline_origin));
        items
    }

    /// Entries the current filter admits.
    pub fn visible_len(&self) -> usize {
        self.chat
            .iter()
            .cloned()
            .map(FeedItem::Chat)
            .chain(self.interactions.iter().cloned().map(FeedItem::Interaction))
            .filter(|item| self.filter.admits(item))
            .count()
    }
}
