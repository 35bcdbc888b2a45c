// File: simucast-core/src/tasks/channel_reader.rs

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use simucast_common::models::chat::ChatMessage;

use crate::channel::ChannelStatus;
use crate::session::events::EngineEvent;

/// Forwards live room messages and channel status flips into the engine
/// queue. Exits on shutdown or when the room side closes.
pub fn spawn_channel_reader_task(
    mut messages_rx: mpsc::Receiver<ChatMessage>,
    mut status_rx: watch::Receiver<ChannelStatus>,
    events_tx: mpsc::Sender<EngineEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("(ChannelReader) shutting down");
                        break;
                    }
                }

                changed = status_rx.changed() => {
                    match changed {
                        Ok(()) => {
                            let status = status_rx.borrow_and_update().clone();
                            debug!("(ChannelReader) channel status: {}", status);
                            if events_tx.send(EngineEvent::ChannelStatus(status)).await.is_err() {
                                break;
                            }
                        }
                        // Status sender gone means the channel was dropped.
                        Err(_) => break,
                    }
                }

                maybe_msg = messages_rx.recv() => {
                    match maybe_msg {
                        Some(msg) => {
                            if events_tx.send(EngineEvent::ChatArrived(msg)).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            debug!("(ChannelReader) room stream closed");
                            break;
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    #[tokio::test]
    async fn test_forwards_messages_and_status_changes() {
        let (msg_tx, msg_rx) = mpsc::channel(8);
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connected);
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_channel_reader_task(msg_rx, status_rx, events_tx, shutdown_rx);

        msg_tx
            .send(ChatMessage::live("m1", "Ana", "hi"))
            .await
            .unwrap();
        let forwarded = timeout(Duration::from_secs(1), events_rx.recv())
            .await
            .expect("message should be forwarded")
            .unwrap();
        assert!(matches!(
            forwarded,
            EngineEvent::ChatArrived(ref m) if m.id == "m1"
        ));

        status_tx.send(ChannelStatus::Reconnecting).unwrap();
        let status_event = timeout(Duration::from_secs(1), events_rx.recv())
            .await
            .expect("status flip should be forwarded")
            .unwrap();
        assert!(matches!(
            status_event,
            EngineEvent::ChannelStatus(ChannelStatus::Reconnecting)
        ));

        let _ = shutdown_tx.send(true);
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("reader should exit on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_exits_when_room_stream_closes() {
        let (msg_tx, msg_rx) = mpsc::channel::<ChatMessage>(8);
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connected);
        let (events_tx, _events_rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_channel_reader_task(msg_rx, status_rx, events_tx, shutdown_rx);
        drop(msg_tx);

        timeout(Duration::from_secs(1), handle)
            .await
            .expect("reader should exit when the room closes")
            .unwrap();

        // Keep the status sender alive until the task is done.
        drop(status_tx);
    }
}
