// File: simucast-core/src/playback/scripted.rs
//
// A clock-driven fake media element. Tests and the demo player drive it
// through a handle while the controller owns the element itself.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use simucast_common::error::Error;

use crate::playback::media::{MediaElement, MediaError, MediaEvent};

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Default)]
struct Inner {
    position: f64,
    duration: f64,
    playing: bool,
    loaded: bool,
    load_positions: Vec<f64>,
    forced_positions: Vec<f64>,
    start_load_calls: u32,
    recover_media_calls: u32,
}

/// Builds a scripted element plus the handle that drives it.
pub fn scripted_media(duration: f64) -> (ScriptedMedia, ScriptedMediaHandle) {
    let inner = Arc::new(Mutex::new(Inner { duration, ..Inner::default() }));
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let media = ScriptedMedia {
        inner: inner.clone(),
        tx: tx.clone(),
        rx: Some(rx),
    };
    let handle = ScriptedMediaHandle { inner, tx };
    (media, handle)
}

pub struct ScriptedMedia {
    inner: Arc<Mutex<Inner>>,
    tx: mpsc::Sender<MediaEvent>,
    rx: Option<mpsc::Receiver<MediaEvent>>,
}

#[async_trait]
impl MediaElement for ScriptedMedia {
    async fn load(&mut self, position: f64) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.position = position;
        inner.loaded = true;
        inner.load_positions.push(position);
        Ok(())
    }

    async fn play(&mut self) -> Result<(), Error> {
        self.inner.lock().unwrap().playing = true;
        let _ = self.tx.send(MediaEvent::Playing).await;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), Error> {
        self.inner.lock().unwrap().playing = false;
        let _ = self.tx.send(MediaEvent::Paused).await;
        Ok(())
    }

    async fn force_position(&mut self, position: f64) -> Result<(), Error> {
        let duration = {
            let mut inner = self.inner.lock().unwrap();
            inner.position = position;
            inner.forced_positions.push(position);
            inner.duration
        };
        let _ = self
            .tx
            .send(MediaEvent::TimeUpdate { position, duration: Some(duration) })
            .await;
        Ok(())
    }

    async fn start_load(&mut self) -> Result<(), Error> {
        self.inner.lock().unwrap().start_load_calls += 1;
        Ok(())
    }

    async fn recover_media(&mut self) -> Result<(), Error> {
        self.inner.lock().unwrap().recover_media_calls += 1;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.inner.lock().unwrap().position
    }

    fn duration(&self) -> Option<f64> {
        Some(self.inner.lock().unwrap().duration)
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<MediaEvent>> {
        self.rx.take()
    }
}

/// Drives a `ScriptedMedia` from outside the controller.
#[derive(Clone)]
pub struct ScriptedMediaHandle {
    inner: Arc<Mutex<Inner>>,
    tx: mpsc::Sender<MediaEvent>,
}

impl ScriptedMediaHandle {
    /// Advances the clock by `dt` seconds of playback, emitting a time
    /// update (and `Ended` once the recording runs out).
    pub async fn advance(&self, dt: f64) {
        let (update, ended) = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.playing || !inner.loaded {
                return;
            }
            inner.position += dt;
            if inner.position >= inner.duration {
                inner.position = inner.duration;
                inner.playing = false;
                ((inner.position, inner.duration), true)
            } else {
                ((inner.position, inner.duration), false)
            }
        };
        let _ = self
            .tx
            .send(MediaEvent::TimeUpdate { position: update.0, duration: Some(update.1) })
            .await;
        if ended {
            let _ = self.tx.send(MediaEvent::Ended).await;
        }
    }

    /// Mimics the viewer scrubbing: the playhead moves first, then the
    /// seeking notification fires, exactly like a real player surface.
    pub async fn request_seek(&self, target: f64) {
        self.inner.lock().unwrap().position = target;
        let _ = self.tx.send(MediaEvent::Seeking { target }).await;
    }

    pub async fn fail(&self, err: MediaError) {
        let _ = self.tx.send(MediaEvent::Error(err)).await;
    }

    /// Runs the clock in the background, `speed` playback seconds per wall
    /// second, until shutdown flips.
    pub fn spawn_ticker(
        &self,
        tick: Duration,
        speed: f64,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            let dt = tick.as_secs_f64() * speed;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        handle.advance(dt).await;
                    }
                    Ok(_) = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            debug!("(ScriptedMedia) ticker stopping");
                            break;
                        }
                    }
                }
            }
        })
    }

    pub fn position(&self) -> f64 {
        self.inner.lock().unwrap().position
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().playing
    }

    /// Positions passed to `load`, oldest first.
    pub fn load_positions(&self) -> Vec<f64> {
        self.inner.lock().unwrap().load_positions.clone()
    }

    /// Positions passed to `force_position`, oldest first.
    pub fn forced_positions(&self) -> Vec<f64> {
        self.inner.lock().unwrap().forced_positions.clone()
    }

    pub fn start_load_calls(&self) -> u32 {
        self.inner.lock().unwrap().start_load_calls
    }

    pub fn recover_media_calls(&self) -> u32 {
        self.inner.lock().unwrap().recover_media_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_advance_emits_time_updates_and_end() {
        let (mut media, handle) = scripted_media(10.0);
        let mut events = media.take_events().expect("events available once");
        assert!(media.take_events().is_none(), "second take yields nothing");

        media.load(8.0).await.expect("load");
        media.play().await.expect("play");
        assert!(matches!(events.recv().await, Some(MediaEvent::Playing)));

        handle.advance(1.0).await;
        match events.recv().await {
            Some(MediaEvent::TimeUpdate { position, .. }) => assert_eq!(position, 9.0),
            other => panic!("expected time update, got {other:?}"),
        }

        handle.advance(5.0).await;
        assert!(matches!(
            events.recv().await,
            Some(MediaEvent::TimeUpdate { position, .. }) if position == 10.0
        ));
        assert!(matches!(events.recv().await, Some(MediaEvent::Ended)));
        assert!(!handle.is_playing());
    }

    #[tokio::test]
    async fn test_advance_is_inert_until_playing() {
        let (mut media, handle) = scripted_media(10.0);
        media.load(0.0).await.expect("load");

        handle.advance(1.0).await;
        assert_eq!(handle.position(), 0.0, "paused clock must not move");
    }
}
