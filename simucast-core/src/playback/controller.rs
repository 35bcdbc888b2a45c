// File: simucast-core/src/playback/controller.rs
//
// Owns the media element for one session: applies the resolved start
// position on every (re)load, polices seeks, holds playback for blocking
// interactions, and walks the staged recovery ladder when the element
// reports errors.

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use simucast_common::error::Error;
use simucast_common::models::session::{PlaybackMode, PlaybackPlan};

use crate::config::PlaybackConfig;
use crate::playback::media::{MediaElement, MediaError, MediaErrorKind, MediaEvent};
use crate::session::events::EngineEvent;

/// Instructions from the session runtime.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Viewer pressed play. Ignored while an interaction holds playback.
    Play,
    /// Viewer pressed pause. Ignored while an interaction holds playback.
    Pause,
    /// A blocking interaction went up; halt until released.
    HoldForInteraction { title: String },
    ReleaseHold,
}

/// Verdict on a requested seek.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekVerdict {
    Allow,
    /// Snap the playhead back to the watermark.
    ForceBack(f64),
}

/// Keeps simulated-live sessions honest: when seeking is disallowed, any
/// seek landing behind the furthest-watched position (beyond a small
/// tolerance) gets snapped back.
#[derive(Debug)]
pub struct SeekPolicy {
    locked: bool,
    tolerance: f64,
    last_valid_time: f64,
}

impl SeekPolicy {
    pub fn new(plan: &PlaybackPlan, tolerance: f64) -> Self {
        SeekPolicy {
            locked: plan.mode == PlaybackMode::SimulatedLive && !plan.allow_seeking,
            tolerance,
            last_valid_time: 0.0,
        }
    }

    /// Every observed position ratchets the watermark forward.
    pub fn observe_time(&mut self, position: f64) {
        if position > self.last_valid_time {
            self.last_valid_time = position;
        }
    }

    pub fn evaluate(&mut self, target: f64) -> SeekVerdict {
        if self.locked && target < self.last_valid_time - self.tolerance {
            return SeekVerdict::ForceBack(self.last_valid_time);
        }
        // An accepted seek becomes the new watermark.
        self.observe_time(target);
        SeekVerdict::Allow
    }

    pub fn last_valid_time(&self) -> f64 {
        self.last_valid_time
    }
}

/// Tracks a playback hold imposed by a blocking interaction. Remembers
/// whether the viewer was actually watching so release only resumes what
/// the hold interrupted.
#[derive(Debug, Default)]
pub struct PauseGate {
    held: bool,
    resume_on_release: bool,
}

impl PauseGate {
    /// Returns true when the media should be paused now.
    pub fn impose(&mut self, currently_playing: bool) -> bool {
        if self.held {
            return false;
        }
        self.held = true;
        self.resume_on_release = currently_playing;
        currently_playing
    }

    /// Returns true when the media should resume.
    pub fn release(&mut self) -> bool {
        if !self.held {
            return false;
        }
        self.held = false;
        std::mem::take(&mut self.resume_on_release)
    }

    pub fn blocks_manual_toggle(&self) -> bool {
        self.held
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    RestartLoad,
    RecoverMedia,
    Surface,
}

/// Bounded escalation for fatal media errors: network errors restart
/// segment loading, decode errors reset the pipeline, anything else (or
/// running out of attempts) surfaces.
#[derive(Debug)]
pub struct RecoveryTracker {
    network_attempts: u32,
    media_attempts: u32,
    max_attempts: u32,
}

impl RecoveryTracker {
    pub fn new(max_attempts: u32) -> Self {
        RecoveryTracker { network_attempts: 0, media_attempts: 0, max_attempts }
    }

    pub fn next_action(&mut self, kind: MediaErrorKind) -> RecoveryAction {
        match kind {
            MediaErrorKind::Network => {
                if self.network_attempts < self.max_attempts {
                    self.network_attempts += 1;
                    RecoveryAction::RestartLoad
                } else {
                    RecoveryAction::Surface
                }
            }
            MediaErrorKind::Decode => {
                if self.media_attempts < self.max_attempts {
                    self.media_attempts += 1;
                    RecoveryAction::RecoverMedia
                } else {
                    RecoveryAction::Surface
                }
            }
            MediaErrorKind::Other => RecoveryAction::Surface,
        }
    }

    /// Healthy playback clears the slate.
    pub fn reset(&mut self) {
        self.network_attempts = 0;
        self.media_attempts = 0;
    }

    pub fn attempts(&self) -> (u32, u32) {
        (self.network_attempts, self.media_attempts)
    }
}

pub struct PlaybackController {
    media: Box<dyn MediaElement>,
    plan: PlaybackPlan,
    video_duration: f64,
    seek: SeekPolicy,
    hold: PauseGate,
    recovery: RecoveryTracker,
    playing: bool,
    started: bool,
    ended: bool,
    events_tx: mpsc::Sender<EngineEvent>,
}

impl PlaybackController {
    pub fn new(
        media: Box<dyn MediaElement>,
        plan: PlaybackPlan,
        video_duration: f64,
        config: &PlaybackConfig,
        events_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        let seek = SeekPolicy::new(&plan, config.seek_tolerance_secs);
        PlaybackController {
            media,
            plan,
            video_duration,
            seek,
            hold: PauseGate::default(),
            recovery: RecoveryTracker::new(config.max_recovery_attempts),
            playing: false,
            started: false,
            ended: false,
            events_tx,
        }
    }

    /// Initial load: resolve the start position against the wall clock and
    /// begin playing.
    async fn start(&mut self) -> Result<(), Error> {
        let position = self
            .plan
            .resolve_start_position(self.video_duration, Utc::now());
        info!(
            "(PlaybackController) loading stream at {:.1}s ({})",
            position, self.plan.mode
        );
        self.media.load(position).await?;
        self.seek.observe_time(position);
        self.media.play().await?;
        Ok(())
    }

    async fn handle_command(&mut self, cmd: PlayerCommand) {
        match cmd {
            PlayerCommand::Play => {
                if self.hold.blocks_manual_toggle() {
                    debug!("(PlaybackController) play ignored while an interaction holds playback");
                    return;
                }
                if let Err(e) = self.media.play().await {
                    error!("(PlaybackController) play failed: {:?}", e);
                }
            }
            PlayerCommand::Pause => {
                if self.hold.blocks_manual_toggle() {
                    debug!("(PlaybackController) pause ignored while an interaction holds playback");
                    return;
                }
                if let Err(e) = self.media.pause().await {
                    error!("(PlaybackController) pause failed: {:?}", e);
                }
            }
            PlayerCommand::HoldForInteraction { title } => {
                info!("(PlaybackController) holding playback for '{}'", title);
                if self.hold.impose(self.playing) {
                    if let Err(e) = self.media.pause().await {
                        error!("(PlaybackController) hold pause failed: {:?}", e);
                    }
                }
            }
            PlayerCommand::ReleaseHold => {
                if self.hold.release() {
                    debug!("(PlaybackController) hold released, resuming");
                    if let Err(e) = self.media.play().await {
                        error!("(PlaybackController) resume failed: {:?}", e);
                    }
                }
            }
        }
    }

    /// Returns false once the controller is done (fatal error surfaced).
    async fn handle_media_event(&mut self, ev: MediaEvent) -> bool {
        match ev {
            MediaEvent::TimeUpdate { position, duration } => {
                self.seek.observe_time(position);
                let _ = self
                    .events_tx
                    .send(EngineEvent::MediaTime { position, duration })
                    .await;
            }
            MediaEvent::Seeking { target } => match self.seek.evaluate(target) {
                SeekVerdict::Allow => {}
                SeekVerdict::ForceBack(to) => {
                    warn!(
                        "(PlaybackController) seek to {:.1}s blocked, snapping back to {:.1}s",
                        target, to
                    );
                    if let Err(e) = self.media.force_position(to).await {
                        error!("(PlaybackController) snap-back failed: {:?}", e);
                    }
                }
            },
            MediaEvent::Playing => {
                self.playing = true;
                self.recovery.reset();
                if !self.started {
                    self.started = true;
                    let position = self.media.position();
                    let _ = self
                        .events_tx
                        .send(EngineEvent::MediaStarted { position })
                        .await;
                }
            }
            MediaEvent::Paused => {
                self.playing = false;
            }
            MediaEvent::Ended => {
                if !self.ended {
                    self.ended = true;
                    self.playing = false;
                    let _ = self.events_tx.send(EngineEvent::MediaEnded).await;
                }
            }
            MediaEvent::Error(err) if !err.fatal => {
                debug!("(PlaybackController) transient media error: {}", err);
            }
            MediaEvent::Error(err) => return self.recover(err).await,
        }
        true
    }

    async fn recover(&mut self, err: MediaError) -> bool {
        match self.recovery.next_action(err.kind) {
            RecoveryAction::RestartLoad => {
                let (n, _) = self.recovery.attempts();
                warn!(
                    "(PlaybackController) {}; restarting segment loading (attempt {})",
                    err, n
                );
                if let Err(e) = self.media.start_load().await {
                    error!("(PlaybackController) start_load failed: {:?}", e);
                    return self.surface(err).await;
                }
                self.reposition_after_reload().await;
                true
            }
            RecoveryAction::RecoverMedia => {
                let (_, n) = self.recovery.attempts();
                warn!(
                    "(PlaybackController) {}; resetting decode pipeline (attempt {})",
                    err, n
                );
                if let Err(e) = self.media.recover_media().await {
                    error!("(PlaybackController) recover_media failed: {:?}", e);
                    return self.surface(err).await;
                }
                self.reposition_after_reload().await;
                true
            }
            RecoveryAction::Surface => self.surface(err).await,
        }
    }

    /// After any reload a simulated-live session pins back onto the live
    /// edge; the illusion breaks if recovery leaves the playhead where the
    /// error happened to strike.
    async fn reposition_after_reload(&mut self) {
        if self.plan.mode == PlaybackMode::SimulatedLive {
            let position = self
                .plan
                .resolve_start_position(self.video_duration, Utc::now());
            self.seek.observe_time(position);
            if let Err(e) = self.media.force_position(position).await {
                error!("(PlaybackController) repositioning after reload failed: {:?}", e);
            }
        }
        if let Err(e) = self.media.play().await {
            error!("(PlaybackController) resume after reload failed: {:?}", e);
        }
    }

    async fn surface(&mut self, err: MediaError) -> bool {
        error!("(PlaybackController) unrecoverable media error: {}", err);
        let _ = self.events_tx.send(EngineEvent::MediaFatal { error: err }).await;
        false
    }
}

/// Runs the controller until shutdown, a fatal error, or the media event
/// stream closing.
pub fn spawn_playback_task(
    mut controller: PlaybackController,
    mut commands_rx: mpsc::Receiver<PlayerCommand>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = controller.start().await {
            error!("(PlaybackController) initial load failed: {:?}", e);
            let error = MediaError::fatal(MediaErrorKind::Other, e.to_string());
            let _ = controller.events_tx.send(EngineEvent::MediaFatal { error }).await;
            return;
        }
        let mut media_events = match controller.media.take_events() {
            Some(rx) => rx,
            None => {
                error!("(PlaybackController) media element has no event stream");
                return;
            }
        };
        loop {
            tokio::select! {
                biased;

                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("(PlaybackController) shutdown signal received");
                        break;
                    }
                }
                Some(cmd) = commands_rx.recv() => {
                    controller.handle_command(cmd).await;
                }
                maybe_ev = media_events.recv() => {
                    match maybe_ev {
                        Some(ev) => {
                            if !controller.handle_media_event(ev).await {
                                break;
                            }
                        }
                        None => {
                            debug!("(PlaybackController) media event stream closed");
                            break;
                        }
                    }
                }
            }
        }
        debug!("(PlaybackController) task exited");
    })
}
