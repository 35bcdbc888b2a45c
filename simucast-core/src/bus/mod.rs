//! src/bus/mod.rs
//!
//! In-process event bus carrying session events out to whoever renders
//! them, with guaranteed delivery to every subscriber via bounded MPSC
//! queues. Its shutdown watch doubles as the stop signal for every
//! background task a session spawns.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};

use simucast_common::models::interaction::InteractionDefinition;
use simucast_common::models::session::EndScreen;

use crate::channel::ChannelStatus;
use crate::results::ResultsSnapshot;

/// Everything a session reports while it runs. Subscribers are expected to
/// be UI-side; nothing in the engine depends on anyone listening.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Countdown tick while the waiting room holds the viewer.
    GateWaiting { remaining_secs: i64 },
    GateAdmitted,

    PlaybackStarted { position: f64 },
    PlaybackTime { position: f64, duration: Option<f64> },
    /// A blocking interaction halted playback.
    PlaybackHeld { title: String },
    PlaybackReleased,
    PlaybackEnded,
    /// Recovery gave up; the session keeps running without video.
    PlaybackFatal { message: String },

    InteractionTriggered(InteractionDefinition),
    /// The set of currently-active overlays changed.
    ActiveInteractions(Vec<InteractionDefinition>),
    /// The combined feed changed; pull a fresh snapshot to render.
    FeedUpdated { visible: usize },

    ChannelStatusChanged(ChannelStatus),
    ResultsUpdated(ResultsSnapshot),
    EndScreenShown(EndScreen),
}

impl SessionEvent {
    /// Short name for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::GateWaiting { .. } => "gate_waiting",
            SessionEvent::GateAdmitted => "gate_admitted",
            SessionEvent::PlaybackStarted { .. } => "playback_started",
            SessionEvent::PlaybackTime { .. } => "playback_time",
            SessionEvent::PlaybackHeld { .. } => "playback_held",
            SessionEvent::PlaybackReleased => "playback_released",
            SessionEvent::PlaybackEnded => "playback_ended",
            SessionEvent::PlaybackFatal { .. } => "playback_fatal",
            SessionEvent::InteractionTriggered(_) => "interaction_triggered",
            SessionEvent::ActiveInteractions(_) => "active_interactions",
            SessionEvent::FeedUpdated { .. } => "feed_updated",
            SessionEvent::ChannelStatusChanged(_) => "channel_status_changed",
            SessionEvent::ResultsUpdated(_) => "results_updated",
            SessionEvent::EndScreenShown(_) => "end_screen_shown",
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<SessionEvent>`.
///
/// - If a subscriber's buffer fills, `publish` awaits until there is
///   space (backpressure).
/// - If a subscriber dropped its receiver, its channel is skipped.
#[derive(Clone)]
pub struct SessionBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<SessionEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber's buffer.
const DEFAULT_BUFFER_SIZE: usize = 1024;

impl SessionBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// Flips the shutdown watch; every task holding a clone of
    /// `shutdown_rx` sees it on the next `select!`.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which session events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<SessionEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers, pruning any that went away.
    pub async fn publish(&self, event: SessionEvent) {
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        let mut closed = false;
        for s in &senders {
            if s.send(event.clone()).await.is_err() {
                closed = true;
            }
        }
        if closed {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
        }
    }
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new()
    }
}
