// File: simucast-core/src/session/mod.rs

pub mod engine;
pub mod events;
pub mod runtime;

pub use engine::{Action, SessionEngine};
pub use events::{EngineEvent, SessionCommand};
pub use runtime::{Collaborators, ViewerSession};
