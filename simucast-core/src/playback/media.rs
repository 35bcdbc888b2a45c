// File: simucast-core/src/playback/media.rs

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use simucast_common::error::Error;

/// Rough classification of a media failure, used to pick a recovery path.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum MediaErrorKind {
    /// Segment fetches failing; a reload usually fixes it.
    #[error("network")]
    Network,
    /// The decode pipeline choked on the stream.
    #[error("decode")]
    Decode,
    #[error("media")]
    Other,
}

#[derive(Debug, Clone, Error)]
#[error("{kind} error: {detail}")]
pub struct MediaError {
    pub kind: MediaErrorKind,
    /// Non-fatal errors are transient hiccups the player already absorbed.
    pub fatal: bool,
    pub detail: String,
}

impl MediaError {
    pub fn fatal(kind: MediaErrorKind, detail: impl Into<String>) -> Self {
        MediaError { kind, fatal: true, detail: detail.into() }
    }

    pub fn transient(kind: MediaErrorKind, detail: impl Into<String>) -> Self {
        MediaError { kind, fatal: false, detail: detail.into() }
    }
}

/// What a media element reports while playing.
#[derive(Debug, Clone)]
pub enum MediaEvent {
    TimeUpdate { position: f64, duration: Option<f64> },
    /// The viewer (or the element itself) is trying to move the playhead.
    Seeking { target: f64 },
    Playing,
    Paused,
    Ended,
    Error(MediaError),
}

/// The player surface the controller drives. Implementations wrap whatever
/// actually renders video; `ScriptedMedia` fakes one for tests and demos.
#[async_trait]
pub trait MediaElement: Send {
    /// (Re)loads the stream and positions playback at `position` seconds.
    async fn load(&mut self, position: f64) -> Result<(), Error>;

    async fn play(&mut self) -> Result<(), Error>;

    async fn pause(&mut self) -> Result<(), Error>;

    /// Moves the playhead directly, bypassing seek policy. Used for
    /// snap-back corrections and for re-pinning the live edge after a
    /// reload.
    async fn force_position(&mut self, position: f64) -> Result<(), Error>;

    /// Network-layer recovery: restart segment loading at the current
    /// position.
    async fn start_load(&mut self) -> Result<(), Error>;

    /// Media-layer recovery: reset the decode pipeline.
    async fn recover_media(&mut self) -> Result<(), Error>;

    fn position(&self) -> f64;

    fn duration(&self) -> Option<f64>;

    /// Hands over the event stream. Yields `Some` exactly once.
    fn take_events(&mut self) -> Option<mpsc::Receiver<MediaEvent>>;
}
