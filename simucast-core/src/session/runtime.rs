// File: simucast-core/src/session/runtime.rs
//
// Owns one viewer's session from launch to teardown: waits out the gate,
// starts the playback controller and channel reader, drives the engine
// off a single event queue, and performs the engine's side effects.

use chrono::Utc;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep, timeout};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use simucast_common::models::feed::{FeedFilter, FeedItem};
use simucast_common::models::interaction::InteractionDefinition;
use simucast_common::models::progress::AnalyticsEvent;
use simucast_common::models::session::{PlaybackSession, SessionAccess};
use simucast_common::traits::{
    AnalyticsSink, InteractionSink, ProgressSink, ReplayChatSource, ResultsSource,
};

use crate::backend::HttpCollaborators;
use crate::bus::{SessionBus, SessionEvent};
use crate::channel::{ChannelStatus, RealtimeChannel};
use crate::config::EngineConfig;
use crate::gate::{GatePoll, SessionGate};
use crate::playback::{MediaElement, PlaybackController, PlayerCommand, spawn_playback_task};
use crate::results::ResultsSnapshot;
use crate::tasks;

use super::engine::{Action, SessionEngine};
use super::events::{EngineEvent, SessionCommand};

const ENGINE_QUEUE_SIZE: usize = 2048;
const PLAYER_QUEUE_SIZE: usize = 16;
/// The final report races process exit; don't let it stall teardown.
const FINAL_SEND_TIMEOUT: Duration = Duration::from_secs(3);
const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// The five upstream seams a running session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub progress: Arc<dyn ProgressSink>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub interactions: Arc<dyn InteractionSink>,
    pub results: Arc<dyn ResultsSource>,
    pub replay_chat: Arc<dyn ReplayChatSource>,
}

impl Collaborators {
    /// Points every seam at one shared HTTP client.
    pub fn http(shared: Arc<HttpCollaborators>) -> Self {
        Collaborators {
            progress: shared.clone(),
            analytics: shared.clone(),
            interactions: shared.clone(),
            results: shared.clone(),
            replay_chat: shared,
        }
    }
}

/// Handle to a live session. Commands go through the same queue as media
/// and network events; state reads lock the engine briefly.
pub struct ViewerSession {
    session: PlaybackSession,
    bus: SessionBus,
    engine: Arc<Mutex<SessionEngine>>,
    events_tx: mpsc::Sender<EngineEvent>,
    main_task: Mutex<Option<JoinHandle<()>>>,
}

impl ViewerSession {
    /// Spawns the session's main task and returns immediately. The viewer
    /// may still be in the waiting room; watch the bus for gate events.
    pub fn launch(
        token: &str,
        access: SessionAccess,
        media: Box<dyn MediaElement>,
        channel: Option<Box<dyn RealtimeChannel>>,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> Self {
        let bus = SessionBus::new();
        let now = Utc::now();
        let session = PlaybackSession::from_access(token, &access, now);
        let (events_tx, events_rx) = mpsc::channel(ENGINE_QUEUE_SIZE);
        let engine = Arc::new(Mutex::new(SessionEngine::new(
            session.clone(),
            &access,
            &config,
        )));

        info!(
            "(ViewerSession) launching {} for '{}' ({}, start {:.1}s)",
            session.session_id, session.webinar.title, session.mode, session.start_position
        );

        let main_task = tokio::spawn(run_session(
            session.clone(),
            access,
            config,
            engine.clone(),
            bus.clone(),
            events_tx.clone(),
            events_rx,
            media,
            channel,
            collaborators,
        ));

        ViewerSession {
            session,
            bus,
            engine,
            events_tx,
            main_task: Mutex::new(Some(main_task)),
        }
    }

    pub fn bus(&self) -> &SessionBus {
        &self.bus
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn is_closed(&self) -> bool {
        self.bus.is_shutdown()
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        self.bus.subscribe(None).await
    }

    pub async fn feed_snapshot(&self) -> Vec<FeedItem> {
        self.engine.lock().await.feed_snapshot()
    }

    pub async fn active_interactions(&self) -> Vec<InteractionDefinition> {
        self.engine.lock().await.active_interactions()
    }

    pub async fn results(&self, interaction_id: Uuid) -> Option<ResultsSnapshot> {
        self.engine.lock().await.results(interaction_id).cloned()
    }

    /// Last playback position the engine has seen.
    pub async fn position(&self) -> f64 {
        self.engine.lock().await.position()
    }

    pub async fn play(&self) {
        self.command(SessionCommand::Play).await;
    }

    pub async fn pause(&self) {
        self.command(SessionCommand::Pause).await;
    }

    pub async fn dismiss(&self, interaction_id: Uuid) {
        self.command(SessionCommand::Dismiss { interaction_id }).await;
    }

    pub async fn answer(&self, interaction_id: Uuid, response: Value) {
        self.command(SessionCommand::Answer {
            interaction_id,
            response,
        })
        .await;
    }

    pub async fn send_chat(&self, text: impl Into<String>) {
        self.command(SessionCommand::SendChat { text: text.into() }).await;
    }

    pub async fn set_filter(&self, filter: FeedFilter) {
        self.command(SessionCommand::SetFilter(filter)).await;
    }

    pub async fn end_screen_clicked(&self) {
        self.command(SessionCommand::EndScreenClicked).await;
    }

    async fn command(&self, cmd: SessionCommand) {
        if self
            .events_tx
            .send(EngineEvent::Command(cmd))
            .await
            .is_err()
        {
            debug!("(ViewerSession) command dropped, session already closed");
        }
    }

    /// Stops the session and waits for the final report to go out. Safe to
    /// call more than once; later calls return immediately.
    pub async fn shutdown(&self) {
        let _ = self
            .events_tx
            .send(EngineEvent::Command(SessionCommand::Shutdown))
            .await;
        let handle = self.main_task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("(ViewerSession) main task ended badly: {:?}", e);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_session(
    session: PlaybackSession,
    access: SessionAccess,
    config: EngineConfig,
    engine: Arc<Mutex<SessionEngine>>,
    bus: SessionBus,
    events_tx: mpsc::Sender<EngineEvent>,
    mut events_rx: mpsc::Receiver<EngineEvent>,
    media: Box<dyn MediaElement>,
    channel: Option<Box<dyn RealtimeChannel>>,
    collaborators: Collaborators,
) {
    let mut shutdown_rx = bus.shutdown_rx.clone();
    let mut gate = SessionGate::new(session.session_start, Utc::now(), &config.gate);

    if !wait_for_gate(&mut gate, &bus, &mut events_rx, &mut shutdown_rx, &config).await {
        info!("(ViewerSession) viewer left the waiting room before the start");
        bus.shutdown();
        return;
    }
    if gate.take_joined() {
        bus.publish(SessionEvent::GateAdmitted).await;
        let _ = tasks::spawn_analytics_send(
            collaborators.analytics.clone(),
            session.token.clone(),
            AnalyticsEvent::Joined,
        );
    }

    let (player_tx, player_rx) = mpsc::channel(PLAYER_QUEUE_SIZE);
    let controller = PlaybackController::new(
        media,
        access.playback.clone(),
        access.webinar.video_duration,
        &config.playback,
        events_tx.clone(),
    );
    let mut helper_tasks: Vec<JoinHandle<()>> =
        vec![spawn_playback_task(controller, player_rx, shutdown_rx.clone())];

    let channel = connect_channel(channel, &config, &events_tx, &mut helper_tasks, &shutdown_rx).await;

    loop {
        tokio::select! {
            biased;

            Ok(_) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    debug!("(ViewerSession) shutdown signal received");
                    break;
                }
            }

            maybe_ev = events_rx.recv() => {
                match maybe_ev {
                    None => break,
                    Some(EngineEvent::Command(SessionCommand::Shutdown)) => {
                        debug!("(ViewerSession) shutdown command received");
                        break;
                    }
                    Some(EngineEvent::Command(SessionCommand::Play)) => {
                        let _ = player_tx.send(PlayerCommand::Play).await;
                    }
                    Some(EngineEvent::Command(SessionCommand::Pause)) => {
                        let _ = player_tx.send(PlayerCommand::Pause).await;
                    }
                    Some(ev) => {
                        let actions = {
                            let mut guard = engine.lock().await;
                            guard.handle_event(ev, Utc::now())
                        };
                        run_actions(
                            actions,
                            &session,
                            &bus,
                            &collaborators,
                            &events_tx,
                            &player_tx,
                            channel.as_ref(),
                            &config,
                            &shutdown_rx,
                            &mut helper_tasks,
                        )
                        .await;
                    }
                }
            }
        }
    }

    finalize_session(&engine, &mut gate, &session, &collaborators).await;
    bus.shutdown();
    disconnect_channel(channel).await;
    drain_tasks(helper_tasks).await;
    info!("(ViewerSession) session {} closed", session.session_id);
}

/// Publishes countdown ticks until the gate opens. Returns false if the
/// viewer shut down while still waiting.
async fn wait_for_gate(
    gate: &mut SessionGate,
    bus: &SessionBus,
    events_rx: &mut mpsc::Receiver<EngineEvent>,
    shutdown_rx: &mut watch::Receiver<bool>,
    config: &EngineConfig,
) -> bool {
    loop {
        match gate.poll(Utc::now()) {
            GatePoll::Admitted { .. } => return true,
            GatePoll::Waiting { remaining } => {
                bus.publish(SessionEvent::GateWaiting {
                    remaining_secs: remaining.num_seconds().max(0),
                })
                .await;

                tokio::select! {
                    biased;

                    Ok(_) = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            return false;
                        }
                    }
                    maybe_ev = events_rx.recv() => {
                        match maybe_ev {
                            Some(EngineEvent::Command(SessionCommand::Shutdown)) | None => {
                                return false;
                            }
                            Some(_) => {
                                debug!("(ViewerSession) dropping an event received while gated");
                            }
                        }
                    }
                    _ = sleep(Duration::from_millis(config.gate.countdown_tick_ms)) => {}
                }
            }
        }
    }
}

async fn connect_channel(
    channel: Option<Box<dyn RealtimeChannel>>,
    config: &EngineConfig,
    events_tx: &mpsc::Sender<EngineEvent>,
    helper_tasks: &mut Vec<JoinHandle<()>>,
    shutdown_rx: &watch::Receiver<bool>,
) -> Option<Arc<Mutex<Box<dyn RealtimeChannel>>>> {
    let mut ch = channel?;

    if let Err(e) = ch.connect().await {
        error!("(ViewerSession) realtime channel connect failed: {:?}", e);
        let _ = events_tx
            .send(EngineEvent::ChannelStatus(ChannelStatus::Failed(
                e.to_string(),
            )))
            .await;
        return None;
    }

    match ch.history(config.feed.history_backlog).await {
        Ok(backlog) if !backlog.is_empty() => {
            debug!("(ViewerSession) room backlog: {} message(s)", backlog.len());
            let _ = events_tx.send(EngineEvent::ChatBacklog(backlog)).await;
        }
        Ok(_) => {}
        Err(e) => warn!("(ViewerSession) room history fetch failed: {:?}", e),
    }

    let status_rx = ch.status_watch();
    let current_status = status_rx.borrow().clone();
    let _ = events_tx
        .send(EngineEvent::ChannelStatus(current_status))
        .await;
    if let Some(messages_rx) = ch.take_messages() {
        helper_tasks.push(tasks::spawn_channel_reader_task(
            messages_rx,
            status_rx,
            events_tx.clone(),
            shutdown_rx.clone(),
        ));
    }

    Some(Arc::new(Mutex::new(ch)))
}

#[allow(clippy::too_many_arguments)]
async fn run_actions(
    actions: Vec<Action>,
    session: &PlaybackSession,
    bus: &SessionBus,
    collaborators: &Collaborators,
    events_tx: &mpsc::Sender<EngineEvent>,
    player_tx: &mpsc::Sender<PlayerCommand>,
    channel: Option<&Arc<Mutex<Box<dyn RealtimeChannel>>>>,
    config: &EngineConfig,
    shutdown_rx: &watch::Receiver<bool>,
    helper_tasks: &mut Vec<JoinHandle<()>>,
) {
    for action in actions {
        match action {
            Action::Publish(event) => bus.publish(event).await,
            Action::ReportProgress(report) => {
                let _ = tasks::spawn_progress_send(
                    collaborators.progress.clone(),
                    session.token.clone(),
                    report,
                );
            }
            Action::TrackAnalytics(event) => {
                let _ = tasks::spawn_analytics_send(
                    collaborators.analytics.clone(),
                    session.token.clone(),
                    event,
                );
            }
            Action::SubmitInteraction {
                interaction_id,
                event,
            } => {
                let _ = tasks::spawn_interaction_send(
                    collaborators.interactions.clone(),
                    session.token.clone(),
                    interaction_id,
                    event,
                );
            }
            Action::FetchChatWindow { from, to } => {
                let _ = tasks::spawn_chat_window_task(
                    collaborators.replay_chat.clone(),
                    session.token.clone(),
                    from,
                    to,
                    events_tx.clone(),
                );
            }
            Action::StartResultsPoller { interaction_id } => {
                helper_tasks.push(tasks::spawn_results_poller_task(
                    collaborators.results.clone(),
                    session.token.clone(),
                    interaction_id,
                    config.results.poll_interval_ms,
                    events_tx.clone(),
                    shutdown_rx.clone(),
                ));
            }
            Action::HoldPlayback { title } => {
                let _ = player_tx
                    .send(PlayerCommand::HoldForInteraction { title })
                    .await;
            }
            Action::ReleasePlayback => {
                let _ = player_tx.send(PlayerCommand::ReleaseHold).await;
            }
            Action::PublishChat(message) => match channel {
                Some(ch) => {
                    // Off the session loop; the room echo comes back through
                    // the channel reader.
                    let ch = ch.clone();
                    tokio::spawn(async move {
                        let guard = ch.lock().await;
                        if let Err(e) = guard.publish(message).await {
                            warn!("(ViewerSession) chat publish failed: {:?}", e);
                        }
                    });
                }
                None => {
                    debug!("(ViewerSession) no realtime channel, chat message stays local");
                }
            },
        }
    }
}

async fn finalize_session(
    engine: &Arc<Mutex<SessionEngine>>,
    gate: &mut SessionGate,
    session: &PlaybackSession,
    collaborators: &Collaborators,
) {
    let finalized = { engine.lock().await.finalize(Utc::now()) };
    let Some((report, summary)) = finalized else {
        return;
    };

    info!(
        "(ViewerSession) final position {:.1}s, {:.1}% watched, completed={}",
        report.position, report.progress, summary.completed
    );
    match timeout(
        FINAL_SEND_TIMEOUT,
        collaborators.progress.report(&session.token, &report),
    )
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("(ViewerSession) final progress report failed: {:?}", e),
        Err(_) => warn!("(ViewerSession) final progress report timed out"),
    }

    if gate.take_left() {
        match timeout(
            FINAL_SEND_TIMEOUT,
            collaborators
                .analytics
                .track(&session.token, &AnalyticsEvent::Left(summary)),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("(ViewerSession) leave event failed: {:?}", e),
            Err(_) => warn!("(ViewerSession) leave event timed out"),
        }
    }
}

async fn disconnect_channel(channel: Option<Arc<Mutex<Box<dyn RealtimeChannel>>>>) {
    if let Some(ch) = channel {
        let mut guard = ch.lock().await;
        if let Err(e) = guard.disconnect().await {
            warn!("(ViewerSession) channel disconnect failed: {:?}", e);
        }
    }
}

async fn drain_tasks(mut tasks: Vec<JoinHandle<()>>) {
    if timeout(TASK_DRAIN_TIMEOUT, join_all(tasks.iter_mut()))
        .await
        .is_err()
    {
        warn!("(ViewerSession) background tasks slow to stop, aborting");
        for task in &tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockRealtimeChannel;
    use simucast_common::Error;
    use simucast_common::models::chat::ChatMessage;

    #[tokio::test]
    async fn test_connect_channel_failure_runs_without_a_room() {
        let mut mock = MockRealtimeChannel::new();
        mock.expect_connect()
            .times(1)
            .returning(|| Err(Error::Channel("connection refused".to_string())));

        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut helper_tasks = Vec::new();

        let out = connect_channel(
            Some(Box::new(mock)),
            &EngineConfig::default(),
            &events_tx,
            &mut helper_tasks,
            &shutdown_rx,
        )
        .await;

        assert!(out.is_none(), "a failed connect should not hand back a channel");
        match events_rx.recv().await {
            Some(EngineEvent::ChannelStatus(ChannelStatus::Failed(detail))) => {
                assert!(
                    detail.contains("connection refused"),
                    "failure detail should carry the connect error, got '{}'",
                    detail
                );
            }
            other => panic!("Expected a failed channel status, got {:?}", other),
        }
        assert!(helper_tasks.is_empty(), "no reader task without a connection");
    }

    #[tokio::test]
    async fn test_connect_channel_pipes_backlog_then_status() {
        let config = EngineConfig::default();
        let backlog_limit = config.feed.history_backlog;
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connected);

        let mut mock = MockRealtimeChannel::new();
        mock.expect_connect().times(1).returning(|| Ok(()));
        mock.expect_history()
            .times(1)
            .withf(move |limit| *limit == backlog_limit)
            .returning(|_| Ok(vec![ChatMessage::live("b1", "Ana", "before you joined")]));
        mock.expect_status_watch().return_once(move || status_rx);
        mock.expect_take_messages().times(1).returning(|| None);

        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut helper_tasks = Vec::new();

        let out = connect_channel(
            Some(Box::new(mock)),
            &config,
            &events_tx,
            &mut helper_tasks,
            &shutdown_rx,
        )
        .await;

        assert!(out.is_some(), "a clean connect should hand back the channel");
        match events_rx.recv().await {
            Some(EngineEvent::ChatBacklog(backlog)) => {
                assert_eq!(backlog.len(), 1);
                assert_eq!(backlog[0].id, "b1");
            }
            other => panic!("Expected the room backlog first, got {:?}", other),
        }
        match events_rx.recv().await {
            Some(EngineEvent::ChannelStatus(ChannelStatus::Connected)) => {}
            other => panic!("Expected the initial channel status, got {:?}", other),
        }
        assert!(
            helper_tasks.is_empty(),
            "no inbound stream was offered, so no reader task"
        );
        drop(status_tx);
    }
}
