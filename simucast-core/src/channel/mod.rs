// File: simucast-core/src/channel/mod.rs

use async_trait::async_trait;
use std::fmt;
use tokio::sync::{mpsc, watch};

use simucast_common::models::chat::ChatMessage;
use simucast_common::Error;

pub mod memory;

pub use memory::{InMemoryChannel, InMemoryChannelHub};

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelStatus {
    Connected,
    Disconnected,
    Reconnecting,
    Failed(String),
}

impl ChannelStatus {
    /// Degraded but expected to recover on its own.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ChannelStatus::Reconnecting)
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Connected => write!(f, "connected"),
            ChannelStatus::Disconnected => write!(f, "disconnected"),
            ChannelStatus::Reconnecting => write!(f, "reconnecting"),
            ChannelStatus::Failed(detail) => write!(f, "failed: {}", detail),
        }
    }
}

/// Transport for the shared live room of one webinar.
///
/// Implementations fan messages out to every connected viewer of the same
/// webinar. `take_messages` hands the inbound receiver to whoever drives the
/// session loop; it yields `Some` only once per connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeChannel: Send {
    async fn connect(&mut self) -> Result<(), Error>;
    async fn disconnect(&mut self) -> Result<(), Error>;
    /// Publish a message into the room. Delivery to the sender follows the
    /// same fan-out path as everyone else's.
    async fn publish(&self, message: ChatMessage) -> Result<(), Error>;
    /// Most recent `limit` room messages, oldest first.
    async fn history(&self, limit: usize) -> Result<Vec<ChatMessage>, Error>;
    fn take_messages(&mut self) -> Option<mpsc::Receiver<ChatMessage>>;
    fn status_watch(&self) -> watch::Receiver<ChannelStatus>;
}
