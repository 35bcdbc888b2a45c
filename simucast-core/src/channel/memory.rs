// File: simucast-core/src/channel/memory.rs

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use uuid::Uuid;

use simucast_common::models::chat::ChatMessage;
use simucast_common::Error;

use super::{ChannelStatus, RealtimeChannel};

const SUBSCRIBER_BUFFER_SIZE: usize = 512;
const DEFAULT_HISTORY_CAP: usize = 200;

struct Room {
    subscribers: Vec<mpsc::Sender<ChatMessage>>,
    history: VecDeque<ChatMessage>,
}

impl Room {
    fn new() -> Self {
        Room {
            subscribers: Vec::new(),
            history: VecDeque::new(),
        }
    }
}

/// Process-local fan-out hub, one room per webinar. Every viewer connected
/// to the same webinar id sees the same messages, including an echo of their
/// own. Used by demos and tests; hosted deployments use a realtime service.
pub struct InMemoryChannelHub {
    rooms: DashMap<Uuid, Room>,
    history_cap: usize,
}

impl InMemoryChannelHub {
    pub fn new() -> Self {
        Self::with_history_cap(DEFAULT_HISTORY_CAP)
    }

    pub fn with_history_cap(history_cap: usize) -> Self {
        InMemoryChannelHub {
            rooms: DashMap::new(),
            history_cap,
        }
    }

    /// Deliver a message to the room: recorded in history, then fanned out
    /// to every live subscriber.
    pub async fn broadcast(&self, webinar_id: Uuid, message: ChatMessage) {
        // Snapshot subscribers so the map entry is not held across sends.
        let senders: Vec<mpsc::Sender<ChatMessage>> = {
            let mut room = self.rooms.entry(webinar_id).or_insert_with(Room::new);
            room.history.push_back(message.clone());
            while room.history.len() > self.history_cap {
                room.history.pop_front();
            }
            room.subscribers.retain(|tx| !tx.is_closed());
            room.subscribers.clone()
        };

        for tx in senders {
            if tx.send(message.clone()).await.is_err() {
                debug!(
                    "(InMemoryChannelHub) subscriber of room {} went away mid-send",
                    webinar_id
                );
            }
        }
    }

    pub fn room_size(&self, webinar_id: Uuid) -> usize {
        self.rooms
            .get(&webinar_id)
            .map(|room| room.subscribers.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    fn join(&self, webinar_id: Uuid, tx: mpsc::Sender<ChatMessage>) {
        let mut room = self.rooms.entry(webinar_id).or_insert_with(Room::new);
        room.subscribers.push(tx);
    }

    fn history_tail(&self, webinar_id: Uuid, limit: usize) -> Vec<ChatMessage> {
        self.rooms
            .get(&webinar_id)
            .map(|room| {
                let skip = room.history.len().saturating_sub(limit);
                room.history.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }
}

impl Default for InMemoryChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One viewer's connection to a hub room.
pub struct InMemoryChannel {
    hub: Arc<InMemoryChannelHub>,
    webinar_id: Uuid,
    inbound_rx: Option<mpsc::Receiver<ChatMessage>>,
    status_tx: watch::Sender<ChannelStatus>,
}

impl InMemoryChannel {
    pub fn new(hub: Arc<InMemoryChannelHub>, webinar_id: Uuid) -> Self {
        let (status_tx, _) = watch::channel(ChannelStatus::Disconnected);
        InMemoryChannel {
            hub,
            webinar_id,
            inbound_rx: None,
            status_tx,
        }
    }
}

#[async_trait]
impl RealtimeChannel for InMemoryChannel {
    async fn connect(&mut self) -> Result<(), Error> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER_SIZE);
        self.hub.join(self.webinar_id, tx);
        self.inbound_rx = Some(rx);
        let _ = self.status_tx.send(ChannelStatus::Connected);
        debug!("(InMemoryChannel) joined room {}", self.webinar_id);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        // Hub-side sender is pruned on the next broadcast once the receiver
        // is gone.
        self.inbound_rx = None;
        let _ = self.status_tx.send(ChannelStatus::Disconnected);
        debug!("(InMemoryChannel) left room {}", self.webinar_id);
        Ok(())
    }

    async fn publish(&self, message: ChatMessage) -> Result<(), Error> {
        self.hub.broadcast(self.webinar_id, message).await;
        Ok(())
    }

    async fn history(&self, limit: usize) -> Result<Vec<ChatMessage>, Error> {
        Ok(self.hub.history_tail(self.webinar_id, limit))
    }

    fn take_messages(&mut self) -> Option<mpsc::Receiver<ChatMessage>> {
        self.inbound_rx.take()
    }

    fn status_watch(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }
}
