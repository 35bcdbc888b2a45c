// File: simucast-core/src/session/engine.rs

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use simucast_common::models::chat::ChatMessage;
use simucast_common::models::feed::FeedItem;
use simucast_common::models::interaction::{InteractionDefinition, InteractionEvent, InteractionPhase};
use simucast_common::models::progress::{
    AnalyticsEvent, ProgressEventType, ProgressReport, SessionSummary,
};
use simucast_common::models::session::{ChatSettings, EndScreen, PlaybackSession, SessionAccess};

use crate::bus::SessionEvent;
use crate::channel::ChannelStatus;
use crate::config::EngineConfig;
use crate::feed::{HistoryCursor, LiveFeedMerger};
use crate::interactions::InteractionScheduler;
use crate::report::HeartbeatReporter;
use crate::results::ResultsSnapshot;

use super::events::{EngineEvent, SessionCommand};

/// Watched share of the recording above which leaving early still counts
/// as a completed viewing.
pub const COMPLETION_THRESHOLD_PERCENT: f64 = 95.0;

const FALLBACK_SENDER_NAME: &str = "Guest";

/// Side effects the engine wants performed. The runtime carries them out;
/// the engine itself never touches the network, the player, or the bus.
#[derive(Debug)]
pub enum Action {
    Publish(SessionEvent),
    ReportProgress(ProgressReport),
    TrackAnalytics(AnalyticsEvent),
    SubmitInteraction {
        interaction_id: Uuid,
        event: InteractionEvent,
    },
    FetchChatWindow {
        from: u32,
        to: u32,
    },
    StartResultsPoller {
        interaction_id: Uuid,
    },
    HoldPlayback {
        title: String,
    },
    ReleasePlayback,
    PublishChat(ChatMessage),
}

/// Single-threaded session state machine.
///
/// Every media tick, chat message, command, and fetch result funnels
/// through `handle_event`, which mutates state and returns the side
/// effects to perform. Keeping it free of I/O and clocks makes the whole
/// session logic unit-testable.
pub struct SessionEngine {
    session: PlaybackSession,
    chat: ChatSettings,
    end_screen: Option<EndScreen>,
    scheduler: InteractionScheduler,
    merger: LiveFeedMerger,
    heartbeat: HeartbeatReporter,
    cursor: HistoryCursor,
    results: HashMap<Uuid, ResultsSnapshot>,
    channel_status: ChannelStatus,
    /// Blocking interactions currently holding playback.
    active_holds: HashSet<Uuid>,
    /// Interactions whose shared results are already being polled.
    pollers_started: HashSet<Uuid>,
    /// Active overlay ids as of the last observation, for change detection.
    active_ids: Vec<Uuid>,
    position: f64,
    duration: Option<f64>,
    ended: bool,
    fatal: Option<String>,
    final_sent: bool,
}

impl SessionEngine {
    pub fn new(session: PlaybackSession, access: &SessionAccess, config: &EngineConfig) -> Self {
        let heartbeat = HeartbeatReporter::new(&config.heartbeat, session.start_position);
        SessionEngine {
            merger: LiveFeedMerger::new(session.timeline_origin()),
            scheduler: InteractionScheduler::new(
                access.interactions.clone(),
                config.scheduler.default_duration_secs,
            ),
            heartbeat,
            cursor: HistoryCursor::new(),
            chat: access.chat.clone(),
            end_screen: access.end_screen.clone(),
            results: HashMap::new(),
            channel_status: ChannelStatus::Disconnected,
            active_holds: HashSet::new(),
            pollers_started: HashSet::new(),
            active_ids: Vec::new(),
            position: session.start_position,
            duration: None,
            ended: false,
            fatal: None,
            final_sent: false,
            session,
        }
    }

    /// Swaps in a heartbeat reporter with a custom jitter source.
    pub fn with_heartbeat(mut self, heartbeat: HeartbeatReporter) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn handle_event(&mut self, event: EngineEvent, now: DateTime<Utc>) -> Vec<Action> {
        match event {
            EngineEvent::MediaTime { position, duration } => self.on_time(position, duration),
            EngineEvent::MediaStarted { position } => {
                self.position = position;
                vec![Action::Publish(SessionEvent::PlaybackStarted { position })]
            }
            EngineEvent::MediaEnded => self.on_ended(),
            EngineEvent::MediaFatal { error } => {
                let message = error.to_string();
                self.fatal = Some(message.clone());
                vec![Action::Publish(SessionEvent::PlaybackFatal { message })]
            }
            EngineEvent::ChatArrived(msg) => {
                if self.merger.push_live(msg) {
                    vec![self.feed_updated()]
                } else {
                    Vec::new()
                }
            }
            EngineEvent::ChatBacklog(messages) => {
                if self.merger.push_batch(messages) > 0 {
                    vec![self.feed_updated()]
                } else {
                    Vec::new()
                }
            }
            EngineEvent::ChatWindow { to, messages } => {
                self.cursor.complete(to);
                if self.merger.push_batch(messages) > 0 {
                    vec![self.feed_updated()]
                } else {
                    Vec::new()
                }
            }
            EngineEvent::ChatWindowFailed => {
                self.cursor.abandon();
                Vec::new()
            }
            EngineEvent::ChannelStatus(status) => {
                self.channel_status = status.clone();
                vec![Action::Publish(SessionEvent::ChannelStatusChanged(status))]
            }
            EngineEvent::ResultsArrived(snapshot) => {
                self.results.insert(snapshot.interaction_id, snapshot.clone());
                vec![Action::Publish(SessionEvent::ResultsUpdated(snapshot))]
            }
            EngineEvent::Command(cmd) => self.on_command(cmd, now),
        }
    }

    fn on_time(&mut self, position: f64, duration: Option<f64>) -> Vec<Action> {
        self.position = position;
        if duration.is_some() {
            self.duration = duration;
        }

        let mut actions = vec![Action::Publish(SessionEvent::PlaybackTime {
            position,
            duration,
        })];

        let newly = self.scheduler.observe_time(position);
        for def in &newly {
            actions.push(Action::SubmitInteraction {
                interaction_id: def.id,
                event: InteractionEvent::Viewed,
            });
            actions.push(Action::Publish(SessionEvent::InteractionTriggered(
                def.clone(),
            )));
            if def.kind.pauses_playback() {
                let was_empty = self.active_holds.is_empty();
                self.active_holds.insert(def.id);
                if was_empty {
                    actions.push(Action::HoldPlayback {
                        title: def.title.clone(),
                    });
                    actions.push(Action::Publish(SessionEvent::PlaybackHeld {
                        title: def.title.clone(),
                    }));
                }
            }
        }

        actions.extend(self.refresh_overlays(!newly.is_empty()));

        if self.heartbeat.offer(position) {
            actions.push(Action::ReportProgress(self.progress_report(
                ProgressEventType::Heartbeat,
            )));
        }

        let current_second = position.max(0.0).floor() as u32;
        if let Some((from, to)) = self.cursor.next_window(current_second) {
            actions.push(Action::FetchChatWindow { from, to });
        }

        actions
    }

    /// Re-derives the active overlay set and the interaction half of the
    /// feed. `force_feed` re-projects even when the active ids are
    /// unchanged, for phase flips that keep the set identical.
    fn refresh_overlays(&mut self, force_feed: bool) -> Vec<Action> {
        let active = self.scheduler.active();
        let active_ids: Vec<Uuid> = active.iter().map(|d| d.id).collect();
        let set_changed = active_ids != self.active_ids;

        let mut actions = Vec::new();
        if set_changed {
            self.active_ids = active_ids;
            actions.push(Action::Publish(SessionEvent::ActiveInteractions(active)));
        }
        if set_changed || force_feed {
            self.merger.set_interactions(self.scheduler.all_triggered());
            actions.push(self.feed_updated());
        }
        actions
    }

    fn on_ended(&mut self) -> Vec<Action> {
        self.ended = true;
        let mut actions = vec![Action::Publish(SessionEvent::PlaybackEnded)];
        if let Some(screen) = &self.end_screen {
            actions.push(Action::Publish(SessionEvent::EndScreenShown(screen.clone())));
            actions.push(Action::TrackAnalytics(AnalyticsEvent::EndScreenViewed));
        }
        actions
    }

    fn on_command(&mut self, cmd: SessionCommand, now: DateTime<Utc>) -> Vec<Action> {
        match cmd {
            SessionCommand::Dismiss { interaction_id } => {
                if !self.scheduler.dismiss(interaction_id) {
                    debug!(
                        "(SessionEngine) ignoring dismiss for inactive interaction {}",
                        interaction_id
                    );
                    return Vec::new();
                }
                let mut actions = vec![Action::SubmitInteraction {
                    interaction_id,
                    event: InteractionEvent::Dismissed,
                }];
                actions.extend(self.release_hold(interaction_id));
                actions.extend(self.refresh_overlays(true));
                actions
            }
            SessionCommand::Answer {
                interaction_id,
                response,
            } => {
                if !self.scheduler.mark_answered(interaction_id, response.clone(), now) {
                    debug!(
                        "(SessionEngine) ignoring answer for interaction {}",
                        interaction_id
                    );
                    return Vec::new();
                }
                let mut actions = vec![Action::SubmitInteraction {
                    interaction_id,
                    event: InteractionEvent::Answered { response },
                }];
                actions.extend(self.release_hold(interaction_id));
                let aggregates = self
                    .scheduler
                    .definition(interaction_id)
                    .map(|d| d.kind.aggregates_results())
                    .unwrap_or(false);
                if aggregates && self.pollers_started.insert(interaction_id) {
                    actions.push(Action::StartResultsPoller { interaction_id });
                }
                actions.extend(self.refresh_overlays(true));
                actions
            }
            SessionCommand::SendChat { text } => {
                if !self.chat.enabled {
                    debug!("(SessionEngine) chat is disabled, dropping outbound message");
                    return Vec::new();
                }
                let sender = self
                    .chat
                    .display_name
                    .clone()
                    .unwrap_or_else(|| FALLBACK_SENDER_NAME.to_string());
                let message = ChatMessage::live(Uuid::new_v4().to_string(), sender, text);
                // Local echo first; the room's fan-out copy dedups by id.
                let mut actions = Vec::new();
                if self.merger.push_live(message.clone()) {
                    actions.push(self.feed_updated());
                }
                actions.push(Action::PublishChat(message));
                actions
            }
            SessionCommand::SetFilter(filter) => {
                self.merger.set_filter(filter);
                vec![self.feed_updated()]
            }
            SessionCommand::EndScreenClicked => {
                if self.end_screen.is_some() {
                    vec![Action::TrackAnalytics(AnalyticsEvent::EndScreenClicked)]
                } else {
                    Vec::new()
                }
            }
            // Play, Pause and Shutdown are routed by the runtime before the
            // queue reaches the engine.
            SessionCommand::Play | SessionCommand::Pause | SessionCommand::Shutdown => {
                debug!("(SessionEngine) runtime-level command reached the engine, ignoring");
                Vec::new()
            }
        }
    }

    fn release_hold(&mut self, interaction_id: Uuid) -> Vec<Action> {
        if self.active_holds.remove(&interaction_id) && self.active_holds.is_empty() {
            vec![
                Action::ReleasePlayback,
                Action::Publish(SessionEvent::PlaybackReleased),
            ]
        } else {
            Vec::new()
        }
    }

    fn feed_updated(&self) -> Action {
        Action::Publish(SessionEvent::FeedUpdated {
            visible: self.merger.visible_len(),
        })
    }

    fn progress_report(&self, event_type: ProgressEventType) -> ProgressReport {
        ProgressReport {
            position: self.position,
            progress: self.session.percent_at(self.position),
            event_type,
        }
    }

    /// Produces the final progress report and the session summary, exactly
    /// once. Returns `None` on any later call.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Option<(ProgressReport, SessionSummary)> {
        if self.final_sent {
            return None;
        }
        self.final_sent = true;
        let percent = self.session.percent_at(self.position);
        let completed = self.ended || percent >= COMPLETION_THRESHOLD_PERCENT;
        let watched_seconds =
            (now - self.session.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        let report = self.progress_report(ProgressEventType::Final);
        let summary = SessionSummary {
            final_position: self.position,
            completed,
            watched_seconds,
        };
        Some((report, summary))
    }

    pub fn feed_snapshot(&self) -> Vec<FeedItem> {
        self.merger.snapshot()
    }

    pub fn active_interactions(&self) -> Vec<InteractionDefinition> {
        self.scheduler.active()
    }

    pub fn interaction_phase(&self, id: Uuid) -> Option<InteractionPhase> {
        self.scheduler.phase(id)
    }

    pub fn results(&self, interaction_id: Uuid) -> Option<&ResultsSnapshot> {
        self.results.get(&interaction_id)
    }

    pub fn channel_status(&self) -> &ChannelStatus {
        &self.channel_status
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn playback_ended(&self) -> bool {
        self.ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use simucast_common::models::interaction::InteractionKind;
    use simucast_common::models::interaction::PollConfig;
    use simucast_common::models::session::{
        PlaybackMode, PlaybackPlan, SessionType, WebinarInfo,
    };
    use crate::report::JitterDraw;

    struct NoJitter;

    impl JitterDraw for NoJitter {
        fn draw(&mut self, _max: f64) -> f64 {
            0.0
        }
    }

    fn poll_definition(trigger_time: u32, duration: Option<u32>) -> InteractionDefinition {
        InteractionDefinition {
            id: Uuid::new_v4(),
            title: "Quick poll".to_string(),
            kind: InteractionKind::Poll(PollConfig {
                options: vec!["A".to_string(), "B".to_string()],
            }),
            trigger_time,
            duration_seconds: duration,
        }
    }

    fn pause_definition(trigger_time: u32) -> InteractionDefinition {
        InteractionDefinition {
            id: Uuid::new_v4(),
            title: "Take a breather".to_string(),
            kind: InteractionKind::Pause(Default::default()),
            trigger_time,
            duration_seconds: None,
        }
    }

    fn access_with(interactions: Vec<InteractionDefinition>) -> SessionAccess {
        SessionAccess {
            webinar: WebinarInfo {
                webinar_id: Uuid::new_v4(),
                title: "Launch week".to_string(),
                video_duration: 1800.0,
            },
            playback: PlaybackPlan {
                session_type: SessionType::OnDemand,
                mode: PlaybackMode::SimulatedLive,
                allow_seeking: false,
                session_start: None,
                start_position: 0.0,
                last_position: None,
            },
            interactions,
            chat: ChatSettings {
                enabled: true,
                display_name: Some("Sam".to_string()),
            },
            end_screen: Some(EndScreen {
                headline: "Thanks for watching".to_string(),
                button_label: Some("Claim offer".to_string()),
                url: Some("https://example.com/offer".to_string()),
            }),
        }
    }

    fn engine_for(access: &SessionAccess) -> SessionEngine {
        let now = Utc::now();
        let session = PlaybackSession::from_access("token-1", access, now);
        let config = EngineConfig::default();
        let heartbeat =
            HeartbeatReporter::with_jitter(&config.heartbeat, 0.0, Box::new(NoJitter));
        SessionEngine::new(session, access, &config).with_heartbeat(heartbeat)
    }

    fn time_event(position: f64) -> EngineEvent {
        EngineEvent::MediaTime {
            position,
            duration: Some(1800.0),
        }
    }

    fn has_feed_update(actions: &[Action]) -> bool {
        actions
            .iter()
            .any(|a| matches!(a, Action::Publish(SessionEvent::FeedUpdated { .. })))
    }

    #[test]
    fn test_trigger_reports_view_and_publishes_overlay() {
        let access = access_with(vec![poll_definition(10, Some(30))]);
        let id = access.interactions[0].id;
        let mut engine = engine_for(&access);

        let quiet = engine.handle_event(time_event(5.0), Utc::now());
        assert!(
            !quiet
                .iter()
                .any(|a| matches!(a, Action::SubmitInteraction { .. })),
            "nothing should trigger before its offset"
        );

        let actions = engine.handle_event(time_event(10.2), Utc::now());
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::SubmitInteraction { interaction_id, event: InteractionEvent::Viewed }
                if *interaction_id == id
        )));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Publish(SessionEvent::InteractionTriggered(def)) if def.id == id
        )));
        assert!(has_feed_update(&actions), "trigger must refresh the feed");
        assert_eq!(engine.active_interactions().len(), 1);
    }

    #[test]
    fn test_pause_interaction_holds_until_dismissed() {
        let access = access_with(vec![pause_definition(20)]);
        let id = access.interactions[0].id;
        let mut engine = engine_for(&access);

        let actions = engine.handle_event(time_event(20.0), Utc::now());
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::HoldPlayback { .. })));

        let actions = engine.handle_event(
            EngineEvent::Command(SessionCommand::Dismiss { interaction_id: id }),
            Utc::now(),
        );
        assert!(actions.iter().any(|a| matches!(a, Action::ReleasePlayback)));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Publish(SessionEvent::PlaybackReleased)
        )));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::SubmitInteraction { event: InteractionEvent::Dismissed, .. }
        )));
    }

    #[test]
    fn test_answering_a_poll_starts_results_polling_once() {
        let access = access_with(vec![poll_definition(10, Some(60))]);
        let id = access.interactions[0].id;
        let mut engine = engine_for(&access);
        engine.handle_event(time_event(10.0), Utc::now());

        let actions = engine.handle_event(
            EngineEvent::Command(SessionCommand::Answer {
                interaction_id: id,
                response: json!({"optionIndex": 1}),
            }),
            Utc::now(),
        );
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::StartResultsPoller { interaction_id } if *interaction_id == id
        )));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::SubmitInteraction { event: InteractionEvent::Answered { .. }, .. }
        )));

        // A second answer is ignored outright.
        let repeat = engine.handle_event(
            EngineEvent::Command(SessionCommand::Answer {
                interaction_id: id,
                response: json!({"optionIndex": 0}),
            }),
            Utc::now(),
        );
        assert!(repeat.is_empty(), "first answer wins, second is a no-op");
    }

    #[test]
    fn test_overlay_expires_when_window_passes() {
        let access = access_with(vec![poll_definition(10, Some(30))]);
        let mut engine = engine_for(&access);

        engine.handle_event(time_event(10.0), Utc::now());
        assert_eq!(engine.active_interactions().len(), 1);

        let actions = engine.handle_event(time_event(40.0), Utc::now());
        assert_eq!(engine.active_interactions().len(), 0);
        assert!(
            actions.iter().any(|a| matches!(
                a,
                Action::Publish(SessionEvent::ActiveInteractions(set)) if set.is_empty()
            )),
            "expiry must publish the shrunken active set"
        );
    }

    #[test]
    fn test_heartbeat_fires_on_interval_and_final_fires_once() {
        let access = access_with(vec![]);
        let mut engine = engine_for(&access);

        let mut reports = 0;
        for tick in 1..=40 {
            let actions = engine.handle_event(time_event(tick as f64), Utc::now());
            reports += actions
                .iter()
                .filter(|a| matches!(a, Action::ReportProgress(r) if r.event_type == ProgressEventType::Heartbeat))
                .count();
        }
        assert_eq!(reports, 4, "zero jitter means a beat every 10 seconds");

        let now = Utc::now();
        let (report, summary) = engine.finalize(now + Duration::seconds(40)).unwrap();
        assert_eq!(report.event_type, ProgressEventType::Final);
        assert!(!summary.completed, "40s of 1800s is nowhere near completion");
        assert!(engine.finalize(now).is_none(), "finalize must be once-only");
    }

    #[test]
    fn test_completion_by_threshold_without_reaching_the_end() {
        let access = access_with(vec![]);
        let mut engine = engine_for(&access);
        engine.handle_event(time_event(1750.0), Utc::now());

        let (_, summary) = engine.finalize(Utc::now()).unwrap();
        assert!(
            summary.completed,
            "1750/1800 is above the completion threshold"
        );
    }

    #[test]
    fn test_natural_end_shows_end_screen_and_completes() {
        let access = access_with(vec![]);
        let mut engine = engine_for(&access);
        engine.handle_event(time_event(900.0), Utc::now());

        let actions = engine.handle_event(EngineEvent::MediaEnded, Utc::now());
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Publish(SessionEvent::PlaybackEnded))));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Publish(SessionEvent::EndScreenShown(_)))));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::TrackAnalytics(AnalyticsEvent::EndScreenViewed)
        )));

        let (_, summary) = engine.finalize(Utc::now()).unwrap();
        assert!(summary.completed, "a natural end always counts as completed");
    }

    #[test]
    fn test_duplicate_chat_message_updates_feed_once() {
        let access = access_with(vec![]);
        let mut engine = engine_for(&access);

        let msg = ChatMessage::live("m1", "Ana", "hello");
        let first = engine.handle_event(EngineEvent::ChatArrived(msg.clone()), Utc::now());
        assert!(has_feed_update(&first));

        let second = engine.handle_event(EngineEvent::ChatArrived(msg), Utc::now());
        assert!(second.is_empty(), "same id from another source is dropped");
    }

    #[test]
    fn test_own_chat_message_echo_is_deduplicated() {
        let access = access_with(vec![]);
        let mut engine = engine_for(&access);

        let actions = engine.handle_event(
            EngineEvent::Command(SessionCommand::SendChat {
                text: "hi all".to_string(),
            }),
            Utc::now(),
        );
        let published = actions
            .iter()
            .find_map(|a| match a {
                Action::PublishChat(m) => Some(m.clone()),
                _ => None,
            })
            .expect("outbound message should be published to the room");
        assert_eq!(published.sender_name, "Sam");
        assert_eq!(engine.feed_snapshot().len(), 1, "local echo lands immediately");

        // The room fans the same message back; the feed must not grow.
        let echo = engine.handle_event(EngineEvent::ChatArrived(published), Utc::now());
        assert!(echo.is_empty());
        assert_eq!(engine.feed_snapshot().len(), 1);
    }

    #[test]
    fn test_chat_disabled_drops_outbound_messages() {
        let mut access = access_with(vec![]);
        access.chat.enabled = false;
        let mut engine = engine_for(&access);

        let actions = engine.handle_event(
            EngineEvent::Command(SessionCommand::SendChat {
                text: "anyone there?".to_string(),
            }),
            Utc::now(),
        );
        assert!(actions.is_empty());
        assert!(engine.feed_snapshot().is_empty());
    }

    #[test]
    fn test_chat_window_fetches_are_serialized_through_the_cursor() {
        let access = access_with(vec![]);
        let mut engine = engine_for(&access);

        let first = engine.handle_event(time_event(5.0), Utc::now());
        let window = first.iter().find_map(|a| match a {
            Action::FetchChatWindow { from, to } => Some((*from, *to)),
            _ => None,
        });
        assert_eq!(window, Some((0, 5)));

        // Nothing new may be requested while the first fetch is in flight.
        let second = engine.handle_event(time_event(8.0), Utc::now());
        assert!(!second
            .iter()
            .any(|a| matches!(a, Action::FetchChatWindow { .. })));

        // Completion moves the cursor; the next tick fetches the gap.
        engine.handle_event(
            EngineEvent::ChatWindow {
                to: 5,
                messages: vec![ChatMessage::simulated("s1", "Host", "welcome", 2)],
            },
            Utc::now(),
        );
        let third = engine.handle_event(time_event(11.0), Utc::now());
        let window = third.iter().find_map(|a| match a {
            Action::FetchChatWindow { from, to } => Some((*from, *to)),
            _ => None,
        });
        assert_eq!(window, Some((5, 11)));
    }

    #[test]
    fn test_failed_window_fetch_is_retried_on_a_later_tick() {
        let access = access_with(vec![]);
        let mut engine = engine_for(&access);

        engine.handle_event(time_event(5.0), Utc::now());
        engine.handle_event(EngineEvent::ChatWindowFailed, Utc::now());

        let retry = engine.handle_event(time_event(6.0), Utc::now());
        let window = retry.iter().find_map(|a| match a {
            Action::FetchChatWindow { from, to } => Some((*from, *to)),
            _ => None,
        });
        assert_eq!(window, Some((0, 6)), "abandoned windows are re-requested");
    }

    #[test]
    fn test_results_snapshot_is_cached_and_republished() {
        let access = access_with(vec![poll_definition(10, Some(30))]);
        let id = access.interactions[0].id;
        let mut engine = engine_for(&access);

        let snapshot = ResultsSnapshot::failed(id, None, "backend hiccup");
        let actions = engine.handle_event(EngineEvent::ResultsArrived(snapshot), Utc::now());
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Publish(SessionEvent::ResultsUpdated(_)))));
        assert!(engine.results(id).is_some());
        assert!(engine.results(id).unwrap().is_stale());
    }

    #[test]
    fn test_fatal_media_error_keeps_the_session_alive() {
        let access = access_with(vec![]);
        let mut engine = engine_for(&access);

        let actions = engine.handle_event(
            EngineEvent::MediaFatal {
                error: crate::playback::MediaError::fatal(
                    crate::playback::MediaErrorKind::Decode,
                    "stream corrupted",
                ),
            },
            Utc::now(),
        );
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Publish(SessionEvent::PlaybackFatal { .. }))));

        // Chat continues to work after playback dies.
        let chat = engine.handle_event(
            EngineEvent::ChatArrived(ChatMessage::live("m9", "Ben", "rip stream")),
            Utc::now(),
        );
        assert!(has_feed_update(&chat));
    }
}
