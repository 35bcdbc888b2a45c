// File: simucast-core/src/playback/mod.rs

pub mod controller;
pub mod media;
pub mod scripted;

pub use controller::{PlaybackController, PlayerCommand, SeekPolicy, SeekVerdict, spawn_playback_task};
pub use media::{MediaElement, MediaError, MediaErrorKind, MediaEvent};
pub use scripted::{ScriptedMedia, ScriptedMediaHandle, scripted_media};
