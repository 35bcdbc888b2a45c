// File: simucast-core/src/report/mod.rs

pub mod heartbeat;

pub use heartbeat::{HeartbeatReporter, JitterDraw, RandomJitter};
