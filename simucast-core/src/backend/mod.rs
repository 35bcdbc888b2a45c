// File: simucast-core/src/backend/mod.rs

pub mod http;
pub mod memory;

pub use http::HttpCollaborators;
pub use memory::{MemoryAccessGate, MemoryBackend};
