// File: simucast-core/src/tasks/chat_window.rs

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use simucast_common::traits::ReplayChatSource;

use crate::session::events::EngineEvent;

/// One-shot fetch of the scripted-chat window `(from, to]`. Reports back
/// through the engine queue either way so the history cursor can move on
/// or retry.
pub fn spawn_chat_window_task(
    source: Arc<dyn ReplayChatSource>,
    token: String,
    from: u32,
    to: u32,
    events_tx: mpsc::Sender<EngineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match source.fetch_window(&token, from, to).await {
            Ok(messages) => {
                debug!(
                    "(ChatWindow) fetched ({}, {}]: {} message(s)",
                    from,
                    to,
                    messages.len()
                );
                let _ = events_tx.send(EngineEvent::ChatWindow { to, messages }).await;
            }
            Err(e) => {
                warn!("(ChatWindow) fetch ({}, {}] failed: {:?}", from, to, e);
                let _ = events_tx.send(EngineEvent::ChatWindowFailed).await;
            }
        }
    })
}
