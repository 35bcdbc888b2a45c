// src/lib.rs

pub mod backend;
pub mod bus;
pub mod channel;
pub mod config;
pub mod feed;
pub mod gate;
pub mod interactions;
pub mod playback;
pub mod report;
pub mod results;
pub mod session;
pub mod tasks;

pub use bus::{SessionBus, SessionEvent};
pub use config::EngineConfig;
pub use session::{Collaborators, ViewerSession};
pub use simucast_common::error::Error;
